use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to allocate an id for collection `{collection}`")]
    NextId {
        collection: &'static str,
        #[source]
        source: Option<MongoError>,
    },
    #[error("failed to {operation}")]
    Query {
        operation: &'static str,
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    pub fn query(operation: &'static str) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Query { operation, source }
    }

    /// True when a unique index rejected the write.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            MongoDaoError::Query { source, .. } => is_duplicate_key(source),
            _ => false,
        }
    }
}

pub fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
