//! One employee session.
//!
//! A [`Session`] wires the login and sharing services to a single
//! [`MasterKeyProvider`], so the key cache has exactly one owner per session
//! and is cleared whenever the session starts, ends, or changes hands.

use std::sync::Arc;

use strongbox_core::{
    EnvelopeCipher, Environment, LockoutPolicy, MasterKeyProvider, PassphraseSource,
};

use crate::{
    auth::LoginService,
    config::ServiceConfig,
    error::ServiceError,
    identity::{IdentityProvider, LocalDirectory},
    objects::{DirObjectStore, ObjectStore},
    sharing::FileSharing,
    storage::{RedbStorage, Storage},
    system_env::SystemEnv,
};

/// Session over the on-disk stores with the local directory.
pub type LocalSession<P> =
    Session<SystemEnv, RedbStorage, DirObjectStore, LocalDirectory<RedbStorage, SystemEnv>, P>;

/// Login and file sharing sharing one key cache.
pub struct Session<E, S, O, I, P: PassphraseSource> {
    identity: Arc<I>,
    keys: Arc<MasterKeyProvider<P>>,
    login: LoginService<E, S, I, P>,
    sharing: FileSharing<E, S, O, I, P>,
}

impl<E, S, O, I, P> Session<E, S, O, I, P>
where
    E: Environment,
    S: Storage,
    O: ObjectStore,
    I: IdentityProvider,
    P: PassphraseSource,
{
    /// Start a session. Any key left in `keys` is discarded.
    pub fn open(
        env: E,
        storage: S,
        objects: O,
        identity: Arc<I>,
        keys: Arc<MasterKeyProvider<P>>,
        policy: LockoutPolicy,
    ) -> Self {
        keys.clear();

        let cipher = EnvelopeCipher::new(env.clone(), Arc::clone(&keys));
        let login = LoginService::new(
            env.clone(),
            storage.clone(),
            Arc::clone(&identity),
            Arc::clone(&keys),
            policy,
        );
        let sharing = FileSharing::new(env, storage, objects, Arc::clone(&identity), cipher);

        Self { identity, keys, login, sharing }
    }

    /// Login and logout.
    pub fn login(&self) -> &LoginService<E, S, I, P> {
        &self.login
    }

    /// Send, list, and download.
    pub fn sharing(&self) -> &FileSharing<E, S, O, I, P> {
        &self.sharing
    }

    /// The identity provider.
    pub fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    /// The session's master key cache.
    pub fn keys(&self) -> &Arc<MasterKeyProvider<P>> {
        &self.keys
    }

    /// Tear down: drop the cached master key.
    ///
    /// Also runs on drop. Does not sign the user out; use
    /// [`LoginService::logout`] for that.
    pub fn close(&self) {
        self.keys.clear();
        tracing::debug!("Session closed");
    }
}

impl<E, S, O, I, P: PassphraseSource> Drop for Session<E, S, O, I, P> {
    fn drop(&mut self) {
        self.keys.clear();
    }
}

impl<P: PassphraseSource> LocalSession<P> {
    /// Open the on-disk stores under `config.data_dir` and start a session.
    ///
    /// # Errors
    ///
    /// - `Storage` / `Objects`: the data directory is unusable
    /// - `Identity`: the password hashing parameters are invalid
    pub async fn open_local(config: &ServiceConfig, passphrase: P) -> Result<Self, ServiceError> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let env = SystemEnv::new();
        let storage = RedbStorage::open(config.metadata_path())?;
        let objects = DirObjectStore::open(config.objects_dir()).await?;
        let directory =
            LocalDirectory::new(storage.clone(), env.clone(), config.password_hashing)?;
        let keys = MasterKeyProvider::with_params(passphrase, config.kdf.clone());

        tracing::debug!(data_dir = %config.data_dir.display(), "Opened local stores");

        Ok(Self::open(env, storage, objects, Arc::new(directory), Arc::new(keys), config.lockout))
    }
}
