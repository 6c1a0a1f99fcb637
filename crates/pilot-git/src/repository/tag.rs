use crate::{Result, TagInfo};

use super::Repository;

impl Repository {
    /// The tag whose commit has the most recent committer time.
    ///
    /// Ties are broken by tag name, highest wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the tags cannot be listed.
    pub fn latest_tag(&self) -> Result<Option<TagInfo>> {
        let mut latest: Option<(i64, TagInfo)> = None;

        for name in self.inner.tag_names(None)?.iter().flatten() {
            let Ok(reference) = self.inner.find_reference(&format!("refs/tags/{name}")) else {
                continue;
            };
            let Ok(commit) = reference.peel_to_commit() else {
                continue;
            };
            let time = commit.time().seconds();
            let candidate = TagInfo {
                name: name.to_string(),
                target_sha: commit.id().to_string(),
            };

            let newer = latest.as_ref().is_none_or(|(latest_time, latest_tag)| {
                (time, candidate.name.as_str()) > (*latest_time, latest_tag.name.as_str())
            });
            if newer {
                latest = Some((time, candidate));
            }
        }

        Ok(latest.map(|(_, tag)| tag))
    }

    /// Number of commits reachable from HEAD but not from `tag`.
    ///
    /// Without a tag, every commit reachable from HEAD is counted.
    ///
    /// # Errors
    ///
    /// Returns an error if HEAD or the tag cannot be resolved.
    pub fn commits_since(&self, tag: Option<&str>) -> Result<usize> {
        let mut walk = self.inner.revwalk()?;
        walk.push_head()?;
        if let Some(tag) = tag {
            let commit = self
                .inner
                .find_reference(&format!("refs/tags/{tag}"))?
                .peel_to_commit()?;
            walk.hide(commit.id())?;
        }

        let mut count = 0;
        for oid in walk {
            oid?;
            count += 1;
        }
        Ok(count)
    }
}
