use std::fmt;

use crate::constants::*;
use crate::error::{consistency, Result, RowError};

/// A table row as the front end sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Fixed-width image of a row as it sits in a leaf cell. The column offsets in
/// `constants` are taken from this struct.
#[repr(C)]
#[derive(Debug)]
pub struct RowRecord {
    pub id: u32,
    pub username: [u8; COLUMN_USERNAME_SIZE],
    pub email: [u8; COLUMN_EMAIL_SIZE],
}

impl Row {
    pub fn new(id: i32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// The primary key. Only meaningful for a row that passed `validate`.
    pub fn key(&self) -> u32 {
        self.id as u32
    }

    pub fn validate(&self) -> std::result::Result<(), RowError> {
        if self.id <= 0 {
            return Err(RowError::NonPositiveId(self.id));
        }
        if self.username.len() > COLUMN_USERNAME_SIZE {
            return Err(RowError::UsernameTooLong(self.username.len()));
        }
        if self.email.len() > COLUMN_EMAIL_SIZE {
            return Err(RowError::EmailTooLong(self.email.len()));
        }
        // NUL is the column padding byte.
        if self.username.contains('\0') {
            return Err(RowError::NulInColumn("username"));
        }
        if self.email.contains('\0') {
            return Err(RowError::NulInColumn("email"));
        }
        Ok(())
    }

    pub fn to_record(&self) -> std::result::Result<RowRecord, RowError> {
        self.validate()?;

        let mut username = [0u8; COLUMN_USERNAME_SIZE];
        username[..self.username.len()].copy_from_slice(self.username.as_bytes());

        let mut email = [0u8; COLUMN_EMAIL_SIZE];
        email[..self.email.len()].copy_from_slice(self.email.as_bytes());

        Ok(RowRecord {
            id: self.id as u32,
            username,
            email,
        })
    }

    pub fn encode(&self) -> Result<[u8; ROW_SIZE]> {
        let record = self.to_record()?;
        let mut bytes = [0u8; ROW_SIZE];
        record.serialize(&mut bytes);
        Ok(bytes)
    }

    pub fn decode(source: &[u8]) -> Result<Self> {
        Ok(RowRecord::deserialize(source)?.into())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

impl RowRecord {
    pub fn serialize(&self, destination: &mut [u8]) {
        destination[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        destination[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]
            .copy_from_slice(&self.username);
        destination[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
    }

    /// Only the engine writes row bytes, so a short slice means a layout bug.
    pub fn deserialize(source: &[u8]) -> Result<Self> {
        if source.len() != ROW_SIZE {
            return Err(consistency!(
                "row slot is {} bytes, expected {}",
                source.len(),
                ROW_SIZE
            ));
        }

        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&source[ID_OFFSET..ID_OFFSET + ID_SIZE]);

        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&source[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);

        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&source[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

        Ok(Self {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        })
    }
}

impl From<RowRecord> for Row {
    fn from(record: RowRecord) -> Self {
        Row {
            id: record.id as i32,
            username: column_text(&record.username),
            email: column_text(&record.email),
        }
    }
}

// Columns are NUL padded on the right.
fn column_text(column: &[u8]) -> String {
    let end = column.iter().position(|&b| b == 0).unwrap_or(column.len());
    String::from_utf8_lossy(&column[..end]).into_owned()
}
