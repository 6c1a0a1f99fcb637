use git2::{Cred, CredentialType, Direction, PushOptions, RemoteCallbacks};

use crate::{GitError, Repository, Result};

const DEFAULT_TOKEN_USERNAME: &str = "x-access-token";
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

impl Repository {
    /// # Errors
    ///
    /// Returns an error if the remote lookup fails.
    pub fn remote_url(&self) -> Result<Option<String>> {
        let Ok(remote) = self.inner.find_remote(self.remote_name()) else {
            return Ok(None);
        };

        Ok(remote.url().map(String::from))
    }

    /// Branches currently on the remote, as `<remote>/<branch>`.
    ///
    /// Asks the remote directly instead of reading remote-tracking refs.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote is missing or unreachable.
    pub fn remote_branches(&self) -> Result<Vec<String>> {
        let mut remote = self.find_remote()?;
        let connection = remote.connect_auth(Direction::Fetch, Some(self.callbacks()), None)?;

        Ok(connection
            .list()?
            .iter()
            .filter_map(|head| head.name().strip_prefix("refs/heads/"))
            .map(|branch| format!("{}/{branch}", self.remote_name()))
            .collect())
    }

    /// Pushes a local branch to the same name on the remote.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::PushRejected`] if the remote refuses the update.
    pub fn push_branch(&self, name: &str, force: bool) -> Result<()> {
        let force = if force { "+" } else { "" };
        self.push(&format!("{force}refs/heads/{name}:refs/heads/{name}"))
    }

    /// Deletes a branch on the remote along with its remote-tracking ref.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::PushRejected`] if the remote refuses the deletion.
    pub fn delete_remote_branch(&self, name: &str) -> Result<()> {
        self.push(&format!(":refs/heads/{name}"))?;

        let tracking = format!("refs/remotes/{}/{name}", self.remote_name());
        match self.inner.find_reference(&tracking) {
            Ok(mut reference) => reference.delete()?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn find_remote(&self) -> Result<git2::Remote<'_>> {
        self.inner
            .find_remote(self.remote_name())
            .map_err(|_| GitError::RemoteNotFound {
                remote: self.remote_name().to_string(),
            })
    }

    fn push(&self, refspec: &str) -> Result<()> {
        let mut remote = self.find_remote()?;
        let mut rejected = None;
        {
            let mut callbacks = self.callbacks();
            callbacks.push_update_reference(|reference, status| {
                if let Some(message) = status {
                    rejected = Some(GitError::PushRejected {
                        reference: reference.to_string(),
                        message: message.to_string(),
                    });
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec], Some(&mut options))?;
        }
        rejected.map_or(Ok(()), Err)
    }

    fn callbacks<'a>(&self) -> RemoteCallbacks<'a> {
        let auth = self.auth.clone();
        let config = self.inner.config().ok();
        let mut attempts = 0;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }

            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = &auth.token {
                    let username = auth.username.as_deref().unwrap_or(DEFAULT_TOKEN_USERNAME);
                    return Cred::userpass_plaintext(username, token);
                }
                if let Some(config) = &config {
                    return Cred::credential_helper(config, url, username_from_url);
                }
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
            }
            Cred::default()
        });
        callbacks
    }
}
