/// Errors raised around the stats core (startup, config, HTTP serving).
/// Stats collection itself never fails.
#[derive(Debug)]
pub enum NexoError {
    Config(String),
    Io(std::io::Error),
}

impl std::fmt::Display for NexoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NexoError::Config(msg) => write!(f, "config error: {}", msg),
            NexoError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for NexoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NexoError::Io(err) => Some(err),
            NexoError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for NexoError {
    fn from(error: std::io::Error) -> Self {
        NexoError::Io(error)
    }
}
