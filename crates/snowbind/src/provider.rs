//! Connection providers and the client-level session factory.
//!
//! Providers decouple the core from any specific pooling implementation:
//! [`DirectProvider`] constructs a fresh connection per acquire,
//! [`PooledProvider`] draws from a bounded pool, and callers can supply any
//! other [`ConnectionProvider`] implementation of their own.

use std::marker::PhantomData;
use std::sync::Mutex;

use crate::driver::Connection;
use crate::error::{ConnectionError, SnowError, SnowResult};
use crate::execute::StatementSettings;
use crate::session::Session;

/// Hands out exclusively-owned connections.
///
/// A provider may serve distinct connections to distinct callers
/// concurrently, but must never hand the same live connection to two callers
/// at once.
pub trait ConnectionProvider {
    type Conn: Connection;

    fn acquire(&self) -> Result<Self::Conn, ConnectionError>;

    fn release(&self, conn: Self::Conn) -> Result<(), ConnectionError>;
}

/// Acquire a connection, run `f`, then always attempt to release.
///
/// When both `f` and the release fail, `f`'s error is surfaced; a
/// release-only failure is surfaced only when `f` succeeded.
pub fn with_connection<P, T>(
    provider: &P,
    f: impl FnOnce(&mut P::Conn) -> SnowResult<T>,
) -> SnowResult<T>
where
    P: ConnectionProvider,
{
    let mut conn = provider.acquire().map_err(SnowError::Connection)?;
    let result = f(&mut conn);
    let released = provider.release(conn);
    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(SnowError::Connection(release_err)),
        (Err(err), _) => Err(err),
    }
}

/// Constructs a fresh connection for every acquire and closes it on release.
pub struct DirectProvider<C, F> {
    connect: F,
    marker: PhantomData<fn() -> C>,
}

impl<C, F> DirectProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    pub fn new(connect: F) -> Self {
        Self {
            connect,
            marker: PhantomData,
        }
    }
}

impl<C, F> ConnectionProvider for DirectProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    type Conn = C;

    fn acquire(&self) -> Result<C, ConnectionError> {
        (self.connect)()
    }

    fn release(&self, mut conn: C) -> Result<(), ConnectionError> {
        conn.close()
            .map_err(|e| ConnectionError::Unknown(e.to_string()))
    }
}

/// Draws connections from a bounded pool.
///
/// Released connections return to the idle list; acquiring beyond
/// `max_size` outstanding connections fails with
/// [`ConnectionError::PoolExhausted`].
pub struct PooledProvider<C, F> {
    connect: F,
    max_size: usize,
    state: Mutex<PoolState<C>>,
}

struct PoolState<C> {
    idle: Vec<C>,
    outstanding: usize,
}

impl<C, F> PooledProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    pub fn new(connect: F, max_size: usize) -> Self {
        Self {
            connect,
            max_size,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                outstanding: 0,
            }),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of connections currently handed out.
    pub fn outstanding(&self) -> usize {
        self.state.lock().map(|state| state.outstanding).unwrap_or(0)
    }
}

impl<C, F> ConnectionProvider for PooledProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    type Conn = C;

    fn acquire(&self) -> Result<C, ConnectionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConnectionError::Unknown("pool lock poisoned".to_string()))?;

        if let Some(conn) = state.idle.pop() {
            state.outstanding += 1;
            return Ok(conn);
        }
        if state.outstanding >= self.max_size {
            return Err(ConnectionError::PoolExhausted {
                max_size: self.max_size,
            });
        }

        let conn = (self.connect)()?;
        state.outstanding += 1;
        Ok(conn)
    }

    fn release(&self, conn: C) -> Result<(), ConnectionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ConnectionError::Unknown("pool lock poisoned".to_string()))?;
        state.outstanding = state.outstanding.saturating_sub(1);
        state.idle.push(conn);
        Ok(())
    }
}

/// Connection-handling policy, for configuration-driven provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingMode {
    /// A fresh connection per acquire.
    Direct,
    /// A bounded pool of reusable connections.
    Pooled { max_size: usize },
}

/// Either provider variant behind one type, chosen by [`PoolingMode`].
pub enum ConfiguredProvider<C, F> {
    Direct(DirectProvider<C, F>),
    Pooled(PooledProvider<C, F>),
}

impl<C, F> ConfiguredProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    pub fn new(mode: PoolingMode, connect: F) -> Self {
        match mode {
            PoolingMode::Direct => Self::Direct(DirectProvider::new(connect)),
            PoolingMode::Pooled { max_size } => Self::Pooled(PooledProvider::new(connect, max_size)),
        }
    }
}

impl<C, F> ConnectionProvider for ConfiguredProvider<C, F>
where
    C: Connection,
    F: Fn() -> Result<C, ConnectionError>,
{
    type Conn = C;

    fn acquire(&self) -> Result<C, ConnectionError> {
        match self {
            Self::Direct(provider) => provider.acquire(),
            Self::Pooled(provider) => provider.acquire(),
        }
    }

    fn release(&self, conn: C) -> Result<(), ConnectionError> {
        match self {
            Self::Direct(provider) => provider.release(conn),
            Self::Pooled(provider) => provider.release(conn),
        }
    }
}

/// Session factory over a connection provider.
///
/// # Example
///
/// ```ignore
/// let client = Client::new(provider);
/// let users: Vec<User> = client.session(|session| {
///     session.list(&frag!("SELECT id, name FROM users").query())
/// })?;
/// ```
pub struct Client<P: ConnectionProvider> {
    provider: P,
    settings: StatementSettings,
}

impl<P: ConnectionProvider> Client<P> {
    pub fn new(provider: P) -> Self {
        Self::with_settings(provider, StatementSettings::default())
    }

    pub fn with_settings(provider: P, settings: StatementSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Borrow a connection for the duration of `f`, exposed as a [`Session`].
    pub fn session<T>(
        &self,
        f: impl FnOnce(&mut Session<'_, P::Conn>) -> SnowResult<T>,
    ) -> SnowResult<T> {
        with_connection(&self.provider, |conn| {
            let mut session = Session::with_settings(conn, self.settings.clone());
            f(&mut session)
        })
    }

    /// Borrow a connection and run `f` inside a transaction on it.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Session<'_, P::Conn>) -> SnowResult<T>,
    ) -> SnowResult<T> {
        self.session(|session| session.transaction(f))
    }
}
