use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use bytemuck::Pod;

use crate::state::DoState;

/// Default cookie written by [`PointerWrap::do_marker`].
pub const DEFAULT_MARKER: u32 = 0x42;

/// Direction of a serialization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Load: bytes flow from the input buffer into the values.
    Read,
    /// Save: bytes flow from the values into the output buffer.
    Write,
    /// Walk the values without touching any buffer; only the offset moves.
    Measure,
}

enum Buffer<'a> {
    Input(&'a [u8]),
    Output(&'a mut Vec<u8>),
    None,
}

/// Single-pass cursor shared by save and load code.
///
/// Every persistent value is walked through the same `do_*` calls in both
/// directions; the mode decides whether the bytes are copied out of the
/// values or back into them. The offset only ever moves forward.
///
/// Reading past the end of the input never panics: the destination is
/// zero-filled and the cursor latches [`PointerWrap::is_truncated`], which
/// makes every later marker check fail.
pub struct PointerWrap<'a> {
    buffer: Buffer<'a>,
    offset: usize,
    mode: Mode,
    truncated: bool,
}

impl<'a> PointerWrap<'a> {
    /// Cursor that loads values from `input`.
    pub fn reader(input: &'a [u8]) -> Self {
        Self { buffer: Buffer::Input(input), offset: 0, mode: Mode::Read, truncated: false }
    }

    /// Cursor that appends every value to `output`, which is cleared first.
    pub fn writer(output: &'a mut Vec<u8>) -> Self {
        output.clear();
        Self { buffer: Buffer::Output(output), offset: 0, mode: Mode::Write, truncated: false }
    }

    /// Cursor that only counts how many bytes a write pass would produce.
    pub fn measurer() -> PointerWrap<'static> {
        PointerWrap { buffer: Buffer::None, offset: 0, mode: Mode::Measure, truncated: false }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_read(&self) -> bool {
        self.mode == Mode::Read
    }

    pub fn is_write(&self) -> bool {
        self.mode == Mode::Write
    }

    pub fn is_measure(&self) -> bool {
        self.mode == Mode::Measure
    }

    /// Number of bytes consumed or produced so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True once a read ran past the end of the input.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes left in the input; `usize::MAX` outside of read mode.
    pub fn remaining(&self) -> usize {
        match &self.buffer {
            Buffer::Input(input) => input.len().saturating_sub(self.offset),
            _ => usize::MAX,
        }
    }

    /// Length of the input in read mode, bytes produced otherwise.
    pub fn len(&self) -> usize {
        match &self.buffer {
            Buffer::Input(input) => input.len(),
            Buffer::Output(output) => output.len(),
            Buffer::None => self.offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `data.len()` raw bytes in the current direction.
    pub fn do_bytes(&mut self, data: &mut [u8]) {
        let len = data.len();
        match &mut self.buffer {
            Buffer::Input(input) => {
                let end = self.offset.checked_add(len).filter(|&end| end <= input.len());
                match end {
                    Some(end) if !self.truncated => data.copy_from_slice(&input[self.offset..end]),
                    _ => {
                        if !self.truncated {
                            tracing::warn!(
                                offset = self.offset,
                                wanted = len,
                                available = input.len().saturating_sub(self.offset),
                                "save state input exhausted"
                            );
                        }
                        self.truncated = true;
                        data.fill(0);
                    }
                }
            }
            Buffer::Output(output) => output.extend_from_slice(data),
            Buffer::None => {}
        }
        self.offset = self.offset.saturating_add(len);
    }

    /// Transfer any value with a [`DoState`] implementation.
    pub fn transfer<T: DoState + ?Sized>(&mut self, value: &mut T) {
        value.do_state(self);
    }

    /// Raw layout copy of a plain-old-data value (host byte order and layout).
    pub fn do_pod<T: Pod>(&mut self, value: &mut T) {
        self.do_bytes(bytemuck::bytes_of_mut(value));
    }

    /// Raw layout copy of a slice of plain-old-data values. No count is written.
    pub fn do_pod_slice<T: Pod>(&mut self, values: &mut [T]) {
        self.do_bytes(bytemuck::cast_slice_mut(values));
    }

    /// Element-wise transfer of a fixed-size run of values. No count is written.
    pub fn do_array<T: DoState>(&mut self, values: &mut [T]) {
        for value in values.iter_mut() {
            value.do_state(self);
        }
    }

    /// Count-prefixed contiguous transfer of a byte vector.
    pub fn do_byte_vec(&mut self, bytes: &mut Vec<u8>) {
        let count = self.do_count(bytes.len());
        if self.is_read() {
            bytes.resize(count, 0);
        }
        self.do_bytes(bytes);
    }

    /// Count-prefixed contiguous transfer of a vector of plain-old-data values.
    pub fn do_pod_vec<T: Pod>(&mut self, values: &mut Vec<T>) {
        let count = self.do_count(values.len());
        if self.is_read() {
            values.resize(count, T::zeroed());
        }
        self.do_pod_slice(values);
    }

    /// Count-prefixed transfer with a caller-supplied per-element routine.
    pub fn do_each_element<T, F>(&mut self, values: &mut Vec<T>, mut member: F)
    where
        T: Default,
        F: FnMut(&mut PointerWrap<'a>, &mut T),
    {
        let count = self.do_count(values.len());
        if self.is_read() {
            values.resize_with(count, T::default);
        }
        for value in values.iter_mut() {
            member(self, value);
        }
    }

    /// Transfer an element count as a `u32`.
    ///
    /// In read mode a count that cannot possibly fit in the rest of the input
    /// (every element occupies at least one byte) latches truncation and
    /// yields zero, so corrupt counts never drive huge allocations.
    pub fn do_count(&mut self, len: usize) -> usize {
        let mut count = u32::try_from(len).unwrap_or(u32::MAX);
        count.do_state(self);
        if !self.is_read() {
            return count as usize;
        }
        let count = count as usize;
        if count > self.remaining() || self.truncated {
            if !self.truncated {
                tracing::warn!(offset = self.offset, count, "container count exceeds save state input");
            }
            self.truncated = true;
            return 0;
        }
        count
    }

    /// Transfer a shared flag through a plain reference.
    pub fn do_flag(&mut self, flag: &AtomicBool) {
        let mut value = flag.load(Ordering::SeqCst);
        value.do_state(self);
        if self.is_read() {
            flag.store(value, Ordering::SeqCst);
        }
    }

    /// Transfer a shared counter through a plain reference.
    pub fn do_atomic_u32(&mut self, counter: &AtomicU32) {
        let mut value = counter.load(Ordering::SeqCst);
        value.do_state(self);
        if self.is_read() {
            counter.store(value, Ordering::SeqCst);
        }
    }

    /// Store an arena index as its signed displacement from `base`.
    ///
    /// On read the index is rebuilt as `base + displacement`; callers must
    /// bounds-check the result against their arena.
    pub fn do_pointer(&mut self, index: &mut usize, base: usize) {
        let mut displacement = (*index as i64).wrapping_sub(base as i64);
        displacement.do_state(self);
        if self.is_read() {
            *index = (base as i64).wrapping_add(displacement) as usize;
        }
    }

    /// Write or check the default section marker after `prev_name`.
    #[must_use]
    pub fn do_marker(&mut self, prev_name: &str) -> bool {
        self.do_marker_with(prev_name, DEFAULT_MARKER)
    }

    /// Write or check a section marker with a custom cookie.
    ///
    /// Returns `false` in read mode when the stored cookie differs or the
    /// input already ran out; everything after that point is meaningless.
    #[must_use]
    pub fn do_marker_with(&mut self, prev_name: &str, magic: u32) -> bool {
        let mut cookie = magic;
        cookie.do_state(self);

        if !self.is_read() {
            return true;
        }
        if self.truncated {
            tracing::error!(
                "save state ended before the marker after \"{prev_name}\"; aborting savestate load"
            );
            return false;
        }
        if cookie != magic {
            tracing::error!(
                "after \"{prev_name}\", found {cookie} ({cookie:#X}) instead of save marker {magic} ({magic:#X}); aborting savestate load"
            );
            return false;
        }
        true
    }
}
