//! Append-only record journal.
//!
//! Used for the escalation queue so that each append costs one framed record
//! instead of a rewrite of the whole collection.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [RECORD 1: codec-encoded]
//! [RECORD 2: codec-encoded]
//! ...
//! ```
//!
//! A crash mid-append leaves a torn final record. It is cut off when the
//! journal is reopened, so readers only ever see complete records.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Result as IoResult, Seek, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::codec;

/// Open journal, positioned for appending.
#[derive(Debug)]
pub struct Journal {
    file: File,
    len: u64,
    sync_on_write: bool,
    /// Set when a failed append could not be rolled back.
    poisoned: bool,
}

impl Journal {
    /// Opens or creates the journal at `path`, returning it with every complete record.
    ///
    /// # Errors
    /// - `InvalidData` if the header or a record before the tail fails verification
    /// - any I/O error opening, reading or truncating the file
    pub fn open<T: DeserializeOwned>(path: &Path, sync_on_write: bool) -> IoResult<(Self, Vec<T>)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let (records, valid_len) = if file.metadata()?.len() < codec::HEADER_LEN {
            // Fresh file, or a crash interrupted writing the header.
            file.set_len(0)?;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            (Vec::new(), codec::HEADER_LEN)
        } else {
            Self::replay(path, &file)?
        };

        if file.metadata()?.len() > valid_len {
            file.set_len(valid_len)?;
            if sync_on_write {
                file.sync_all()?;
            }
        }

        let file = OpenOptions::new().append(true).open(path)?;

        Ok((
            Self {
                file,
                len: valid_len,
                sync_on_write,
                poisoned: false,
            },
            records,
        ))
    }

    fn replay<T: DeserializeOwned>(path: &Path, file: &File) -> IoResult<(Vec<T>, u64)> {
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file.try_clone()?);
        reader.rewind()?;
        codec::read_header(&mut reader)?;

        let mut records = Vec::new();
        let mut valid_len = reader.stream_position()?;

        while valid_len < file_size {
            match codec::decode(&mut reader) {
                Ok(record) => {
                    records.push(record);
                    valid_len = reader.stream_position()?;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(
                        path = %path.display(),
                        discarded_bytes = file_size - valid_len,
                        "truncating torn record at end of journal"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((records, valid_len))
    }

    /// Appends one record; it is durable on return when `sync_on_write` is set.
    ///
    /// On failure the file is cut back to its previous length so the next
    /// append does not land behind a partial record. If that truncation also
    /// fails the journal refuses every later append until it is reopened.
    pub fn append<T: Serialize>(&mut self, record: &T) -> IoResult<()> {
        if self.poisoned {
            return Err(std::io::Error::new(
                ErrorKind::Other,
                "journal has a partial record that could not be rolled back; reopen to recover",
            ));
        }

        let encoded = codec::encode(record)?;

        let written = self.file.write_all(&encoded).and_then(|()| {
            if self.sync_on_write {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            if let Err(rollback) = self.file.set_len(self.len) {
                warn!(
                    valid_len = self.len,
                    error = %rollback,
                    "journal rollback failed, refusing further appends"
                );
                self.poisoned = true;
            }
            return Err(e);
        }

        self.len += encoded.len() as u64;
        Ok(())
    }

    /// Bytes of valid data, header included.
    #[cfg(test)]
    pub const fn len(&self) -> u64 {
        self.len
    }
}
