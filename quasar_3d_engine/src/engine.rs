/// Quasar3D Engine - process-scoped engine state
///
/// Holds the global logger and the font library shared by every resource
/// pool. Both use thread-safe static storage with RwLock. The font library
/// is created on first use and torn down by `Engine::shutdown`.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::{Result, Error};
use crate::import::FontLibrary;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding the process-scoped resources
struct EngineState {
    /// Glyph rasterizer shared by all pools, created on first font load
    font_library: RwLock<Option<FontLibrary>>,
}

impl EngineState {
    /// Create a new empty engine state
    fn new() -> Self {
        Self {
            font_library: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Engine state manager
///
/// # Example
///
/// ```no_run
/// use quasar_3d_engine::quasar3d::Engine;
/// use quasar_3d_engine::quasar3d::resource::{ResourceManager, StreamingConfig};
///
/// Engine::initialize()?;
///
/// let mut resources = ResourceManager::new();
/// let pool = resources.create_pool(StreamingConfig::default());
/// // load, commit, draw...
///
/// Engine::shutdown();
/// # Ok::<(), quasar_3d_engine::quasar3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("quasar3d::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("quasar3d::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("quasar3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> &'static EngineState {
        ENGINE_STATE.get_or_init(EngineState::new)
    }

    /// Initialize the engine
    ///
    /// Optional: the first font load initializes the engine state as well.
    /// Calling it more than once is harmless.
    pub fn initialize() -> Result<()> {
        Self::state();
        Ok(())
    }

    /// Tear down the process-scoped resources
    ///
    /// The font library is dropped; a later font load creates a new one.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut library) = state.font_library.write() {
                if library.take().is_some() {
                    crate::engine_info!("quasar3d::Engine", "Font library shut down");
                }
            }
        }
    }

    // ===== FONT LIBRARY API =====

    /// Run `f` with exclusive access to the font library, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns `Error::BackendError` if the library lock is poisoned, or
    /// whatever `f` returns.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use quasar_3d_engine::quasar3d::Engine;
    ///
    /// let face = Engine::with_font_library(|library| {
    ///     library.load_face(std::path::Path::new("assets/fonts/ui.ttf"))
    /// })?;
    /// # Ok::<(), quasar_3d_engine::quasar3d::Error>(())
    /// ```
    pub fn with_font_library<R>(f: impl FnOnce(&mut FontLibrary) -> Result<R>) -> Result<R> {
        let mut lock = Self::state().font_library.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("FontLibrary lock poisoned".to_string())
            ))?;

        let library = lock.get_or_insert_with(FontLibrary::new);
        f(library)
    }

    /// Whether the font library currently exists
    pub fn has_font_library() -> bool {
        ENGINE_STATE
            .get()
            .and_then(|state| state.font_library.read().ok().map(|lock| lock.is_some()))
            .unwrap_or(false)
    }

    /// Reset process-scoped state for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut library) = state.font_library.write() {
                *library = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// Replace the default logger with a custom implementation (file logger, network logger, etc.)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use quasar_3d_engine::quasar3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by the engine_error!, engine_err! and engine_bail! macros.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
