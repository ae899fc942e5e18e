//! Constants shared by the FLAT store and its tools

/// Key under which the serialized database is stored
pub const STORAGE_KEY: &str = "mockDb";

/// Current schema version of the persisted database blob
pub const SCHEMA_VERSION: u32 = 3;

/// Default filename of the SQLite key-value storage
pub const STORAGE_FILENAME: &str = "flat.sqlite";

/// Default directory (under the home directory) holding the storage file
pub const STORAGE_DIR: &str = ".flat";

/// Topic that matches events from every collection
pub const WILDCARD_TOPIC: &str = "*";

/// Upper bound of task and assignment progress
pub const MAX_PROGRESS: u8 = 100;
