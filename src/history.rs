//! Conversation history storage.
//!
//! The transcript is an ordered list of role-tagged messages owned by the
//! running session. It persists to a JSON file shaped
//! `{history: [...], last_updated: <RFC 3339>}`, rewritten in full after
//! every successful exchange and deleted on an explicit clear.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::observability::{HISTORY_LOAD_FAILURES, HISTORY_SAVES};
use crate::types::Message;

/// File name of the per-user history file, resolved under `$HOME`.
const HISTORY_FILE_NAME: &str = ".deepchat_history.json";

/// The ordered conversation history for a session.
///
/// Messages are immutable once appended; the sequence grows monotonically
/// except on an explicit clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the transcript.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Clears the in-memory transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the ordered messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true when the transcript holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Loads a transcript from disk.
    ///
    /// A missing file is an empty transcript, not an error. A file that
    /// exists but cannot be parsed fails with a corrupt-history error so
    /// the caller can warn and continue with an empty transcript.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let file =
            File::open(path).map_err(|err| Error::io("failed to open history file", err))?;
        let reader = BufReader::new(file);
        let parsed: HistoryFile = from_reader(reader).map_err(|err| {
            HISTORY_LOAD_FAILURES.click();
            Error::corrupt_history(
                format!("failed to parse {}", path.display()),
                Some(Box::new(err)),
            )
        })?;
        Ok(Self {
            messages: parsed.history,
        })
    }

    /// Saves the transcript to disk.
    ///
    /// Writes to a sibling temp file and renames it over the target so a
    /// crash mid-write cannot corrupt the previously saved copy.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let record = HistoryFile {
            history: self.messages.clone(),
            last_updated: OffsetDateTime::now_utc(),
        };
        let tmp_path = sibling_tmp_path(path);
        let file = File::create(&tmp_path)
            .map_err(|err| Error::io("failed to create history temp file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &record).map_err(|err| {
            Error::serialization("failed to serialize history", Some(Box::new(err)))
        })?;
        fs::rename(&tmp_path, path)
            .map_err(|err| Error::io("failed to replace history file", err))?;
        HISTORY_SAVES.click();
        Ok(())
    }

    /// Clears the transcript and deletes the backing file.
    ///
    /// The in-memory state is cleared unconditionally. A missing file is
    /// fine; any other deletion failure is returned after the clear so the
    /// caller can report it.
    pub fn clear_with_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.clear();
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io("failed to delete history file", err)),
        }
    }
}

/// Returns the default per-user history path.
pub fn default_history_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(HISTORY_FILE_NAME)
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// On-disk representation of the conversation history.
#[derive(Serialize, Deserialize)]
struct HistoryFile {
    history: Vec<Message>,
    #[serde(with = "crate::utils::time")]
    last_updated: OffsetDateTime,
}
