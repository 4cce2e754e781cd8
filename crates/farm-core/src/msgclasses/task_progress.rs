//! Task progress update sent by render nodes while a task runs.
//!
//! Payload layout (all integers big-endian):
//! ```text
//! client_id:i32 job:i32 block:i32 task:i32 number:i32
//! status:i8 percent:i8 frame:i32 percent_frame:i8
//! activity:string
//! data_len:i32 files_count:i32
//! [data:data_len]                                  if data_len > 0
//! [files_data_len:i32 sizes:i32-list names:string-list
//!  files_data:files_data_len]                      if files_count > 0
//! ```
//!
//! # Ownership of activity data
//!
//! A render node attaches the task's raw output without copying it: the
//! message borrows the caller's slice (`Cow::Borrowed`), so the slice must
//! outlive transmission. A server that parses the message gets its own copy
//! (`Cow::Owned`). [`TaskProgress::into_owned`] detaches a borrowed message
//! so it can cross a thread boundary.
//!
//! # File bundle
//!
//! Any number of named files travel in one contiguous blob, back to back in
//! append order. There is no offset index: file `i` starts at the sum of the
//! sizes of files `0..i`.

use std::borrow::Cow;
use std::fmt;

use crate::protocol::buffer::{wire_len, WireBuffer};
use crate::protocol::error::WireError;
use crate::protocol::payload::{FromWire, WirePayload};

/// Extra capacity reserved per appended file, as a multiple of its size.
const FILE_GROWTH_FACTOR: usize = 4;

/// Identifies the task a progress update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskKey {
    /// Render client that runs the task.
    pub client_id: i32,
    pub job: i32,
    pub block: i32,
    pub task: i32,
    /// Run sequence number of the task on this client.
    pub number: i32,
}

/// Scalar progress fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub status: i8,
    /// Overall percent complete, 0–100.
    pub percent: i8,
    /// Frame currently rendering.
    pub frame: i32,
    /// Percent complete of the current frame, 0–100.
    pub percent_frame: i8,
}

/// Named file blobs sharing one growable data region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBundle {
    names: Vec<String>,
    sizes: Vec<usize>,
    data: Vec<u8>,
}

impl FileBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Total bytes of all files; equals the sum of recorded sizes.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Reserved bytes in the data region.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Appends one file.
    ///
    /// The first file reserves four times its size. A later file that does
    /// not fit extends the reservation by four times its own size. Existing
    /// bytes are moved forward intact.
    pub fn append(&mut self, name: impl Into<String>, bytes: &[u8]) {
        let size = bytes.len();
        if self.is_empty() && self.data.capacity() == 0 {
            self.data = Vec::with_capacity(size * FILE_GROWTH_FACTOR);
        } else if self.data.capacity() < self.data.len() + size {
            let target = self.data.capacity() + size * FILE_GROWTH_FACTOR;
            self.data.reserve_exact(target - self.data.len());
        }
        self.names.push(name.into());
        self.sizes.push(size);
        self.data.extend_from_slice(bytes);
    }

    /// Contents of file `index`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::IndexOutOfRange`] when `index >= len()`.
    pub fn data(&self, index: usize) -> Result<&[u8], WireError> {
        let size = *self.sizes.get(index).ok_or(WireError::IndexOutOfRange {
            index,
            count: self.len(),
        })?;
        let offset: usize = self.sizes[..index].iter().sum();
        Ok(&self.data[offset..offset + size])
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn size(&self, index: usize) -> Option<usize> {
        self.sizes.get(index).copied()
    }

    /// Iterates `(name, contents)` in append order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        let mut offset = 0;
        self.names.iter().zip(&self.sizes).map(move |(name, &size)| {
            let start = offset;
            offset += size;
            (name.as_str(), &self.data[start..offset])
        })
    }

    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        let sizes = self
            .sizes
            .iter()
            .map(|&size| wire_len(size))
            .collect::<Result<Vec<_>, _>>()?;
        buf.write_i32(wire_len(self.data.len())?)?;
        buf.write_i32_list(&sizes)?;
        buf.write_string_list(&self.names)?;
        buf.write_bytes(&self.data)
    }

    fn read_from(buf: &mut WireBuffer, count: usize) -> Result<Self, WireError> {
        let data_len = buf.read_len()?;
        let sizes = buf
            .read_i32_list()?
            .into_iter()
            .map(|size| {
                usize::try_from(size)
                    .map_err(|_| WireError::Malformed(format!("negative file size {size}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let names = buf.read_string_list()?;

        if sizes.len() != count || names.len() != count {
            return Err(WireError::Malformed(format!(
                "file bundle declares {count} files but carries {} sizes and {} names",
                sizes.len(),
                names.len()
            )));
        }
        let total: usize = sizes.iter().sum();
        if total != data_len {
            return Err(WireError::Malformed(format!(
                "file sizes sum to {total} but bundle holds {data_len} bytes"
            )));
        }
        let data = buf.read_bytes(data_len)?;
        Ok(Self { names, sizes, data })
    }
}

/// Progress report for one running task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress<'a> {
    pub key: TaskKey,
    pub state: ProgressState,
    /// Free-text activity label, e.g. `"rendering"`.
    pub activity: String,
    data: Option<Cow<'a, [u8]>>,
    files: FileBundle,
}

impl<'a> TaskProgress<'a> {
    /// Sender-side constructor. `data` is borrowed, not copied.
    pub fn new(
        key: TaskKey,
        state: ProgressState,
        activity: impl Into<String>,
        data: Option<&'a [u8]>,
    ) -> Self {
        Self {
            key,
            state,
            activity: activity.into(),
            data: data.filter(|d| !d.is_empty()).map(Cow::Borrowed),
            files: FileBundle::new(),
        }
    }

    /// Activity data attached by the sender, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    /// `true` when the activity data is a copy owned by this message.
    pub fn owns_data(&self) -> bool {
        matches!(self.data, Some(Cow::Owned(_)))
    }

    pub fn append_file(&mut self, name: impl Into<String>, bytes: &[u8]) {
        self.files.append(name, bytes);
    }

    /// Contents of file `index`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::IndexOutOfRange`] when no such file was appended.
    pub fn file_data(&self, index: usize) -> Result<&[u8], WireError> {
        self.files.data(index)
    }

    pub fn files_count(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &FileBundle {
        &self.files
    }

    /// Detaches the message from any borrowed activity data.
    pub fn into_owned(self) -> TaskProgress<'static> {
        TaskProgress {
            key: self.key,
            state: self.state,
            activity: self.activity,
            data: self.data.map(|d| Cow::Owned(d.into_owned())),
            files: self.files,
        }
    }
}

impl WirePayload for TaskProgress<'_> {
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        let TaskKey {
            client_id,
            job,
            block,
            task,
            number,
        } = self.key;
        buf.write_i32(client_id)?;
        buf.write_i32(job)?;
        buf.write_i32(block)?;
        buf.write_i32(task)?;
        buf.write_i32(number)?;

        buf.write_i8(self.state.status)?;
        buf.write_i8(self.state.percent)?;
        buf.write_i32(self.state.frame)?;
        buf.write_i8(self.state.percent_frame)?;
        buf.write_string(&self.activity)?;

        buf.write_i32(wire_len(self.data_len())?)?;
        buf.write_i32(wire_len(self.files.len())?)?;
        if let Some(data) = self.data() {
            buf.write_bytes(data)?;
        }
        if !self.files.is_empty() {
            self.files.write_to(buf)?;
        }
        Ok(())
    }
}

impl FromWire for TaskProgress<'_> {
    fn read_from(buf: &mut WireBuffer) -> Result<Self, WireError> {
        let key = TaskKey {
            client_id: buf.read_i32()?,
            job: buf.read_i32()?,
            block: buf.read_i32()?,
            task: buf.read_i32()?,
            number: buf.read_i32()?,
        };
        let state = ProgressState {
            status: buf.read_i8()?,
            percent: buf.read_i8()?,
            frame: buf.read_i32()?,
            percent_frame: buf.read_i8()?,
        };
        let activity = buf.read_string()?;
        let data_len = buf.read_len()?;
        let files_count = buf.read_len()?;

        let data = if data_len > 0 {
            Some(Cow::Owned(buf.read_bytes(data_len)?))
        } else {
            None
        };
        let files = if files_count > 0 {
            FileBundle::read_from(buf, files_count)?
        } else {
            FileBundle::new()
        };

        Ok(Self {
            key,
            state,
            activity,
            data,
            files,
        })
    }
}

/// Short form by default; `{:#}` gives the full form, including activity data.
impl fmt::Display for TaskProgress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = &self.key;
        let s = &self.state;
        if f.alternate() {
            write!(
                f,
                "TaskUp: client={}, job={}, block={}, task={}, number={}, activity={}, \
                 datalen={}, files={}, status={}, percent={}, frame={}, percent_frame={}",
                k.client_id,
                k.job,
                k.block,
                k.task,
                k.number,
                self.activity,
                self.data_len(),
                self.files.len(),
                s.status,
                s.percent,
                s.frame,
                s.percent_frame
            )?;
            if let Some(data) = self.data() {
                write!(f, "\ndata:\n{}", String::from_utf8_lossy(data))?;
            }
            Ok(())
        } else {
            write!(
                f,
                "TaskUp: C{} J{} B{} T{} #{} A{} D{} F{} S{} {}%",
                k.client_id,
                k.job,
                k.block,
                k.task,
                k.number,
                self.activity,
                self.data_len(),
                self.files.len(),
                s.status,
                s.percent
            )
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
