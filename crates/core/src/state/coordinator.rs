//! Whole-machine save and load passes.
//!
//! A [`StateRoot`] walks its subsystems in a fixed order and calls
//! [`checkpoint`] after each one. Loads are transactional: the walk runs on a
//! scratch copy and only replaces the live value once every section and
//! marker checked out.

use crate::state::{PointerWrap, StateError, StateResult};

/// Top of a serializable object graph.
pub trait StateRoot: Clone {
    /// Walk every subsystem in order, placing a marker after each.
    fn do_state(&mut self, p: &mut PointerWrap<'_>) -> StateResult<()>;
}

/// Place (or verify) the marker that closes `section`.
pub fn checkpoint(p: &mut PointerWrap<'_>, section: &str) -> StateResult<()> {
    if p.do_marker(section) {
        return Ok(());
    }
    if p.is_truncated() {
        Err(StateError::Truncated { section: section.to_string(), offset: p.offset(), len: p.len() })
    } else {
        Err(StateError::Desync { section: section.to_string() })
    }
}

/// Turn a subsystem's own success flag into a section error.
pub fn require(accepted: bool, section: &str) -> StateResult<()> {
    if accepted {
        Ok(())
    } else {
        Err(StateError::SubsystemFailed { section: section.to_string() })
    }
}

/// Number of bytes a save of `root` would produce.
pub fn measure_state<R: StateRoot>(root: &mut R) -> StateResult<usize> {
    let mut p = PointerWrap::measurer();
    root.do_state(&mut p)?;
    Ok(p.offset())
}

/// Serialize `root` into `buffer`, replacing its contents.
pub fn save_state_into<R: StateRoot>(root: &mut R, buffer: &mut Vec<u8>) -> StateResult<()> {
    let size = measure_state(root)?;
    buffer.clear();
    buffer.reserve(size);

    let mut p = PointerWrap::writer(buffer);
    root.do_state(&mut p)?;
    tracing::debug!(bytes = p.offset(), "save state written");
    Ok(())
}

/// Serialize `root` into a fresh buffer.
pub fn save_state<R: StateRoot>(root: &mut R) -> StateResult<Vec<u8>> {
    let mut buffer = Vec::new();
    save_state_into(root, &mut buffer)?;
    Ok(buffer)
}

/// Deserialize `input` into a copy of `root` and return it without touching `root`.
pub fn decode_state<R: StateRoot>(root: &R, input: &[u8]) -> StateResult<R> {
    let mut scratch = root.clone();
    let mut p = PointerWrap::reader(input);
    scratch.do_state(&mut p)?;

    if p.is_truncated() {
        return Err(StateError::Truncated {
            section: "end of state".to_string(),
            offset: p.offset(),
            len: input.len(),
        });
    }
    if p.offset() < input.len() {
        tracing::warn!(
            consumed = p.offset(),
            len = input.len(),
            "save state has trailing bytes after the last section"
        );
    }
    Ok(scratch)
}

/// Load `input` into `root`. On any failure `root` is left exactly as it was.
pub fn load_state<R: StateRoot>(root: &mut R, input: &[u8]) -> StateResult<()> {
    let loaded = decode_state(root, input)?;
    *root = loaded;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair {
        first: u32,
        second: Vec<u16>,
        accept: bool,
    }

    impl StateRoot for Pair {
        fn do_state(&mut self, p: &mut PointerWrap<'_>) -> StateResult<()> {
            p.transfer(&mut self.first);
            checkpoint(p, "First")?;
            p.transfer(&mut self.second);
            require(self.accept || !p.is_read(), "Second")?;
            checkpoint(p, "Second")
        }
    }

    #[test]
    fn round_trip_through_coordinator() {
        let mut source = Pair { first: 9, second: vec![1, 2, 3], accept: true };
        let bytes = save_state(&mut source).expect("save");
        assert_eq!(bytes.len(), measure_state(&mut source).expect("measure"));

        let mut target = Pair { accept: true, ..Pair::default() };
        load_state(&mut target, &bytes).expect("load");
        assert_eq!(target, source);
    }

    #[test]
    fn corrupted_marker_reports_section_and_keeps_target() {
        let mut source = Pair { first: 9, second: vec![1], accept: true };
        let mut bytes = save_state(&mut source).expect("save");
        // First marker sits right after the u32.
        bytes[4] ^= 0xFF;

        let mut target = Pair { first: 1, second: vec![7], accept: true };
        let before = target.clone();
        let err = load_state(&mut target, &bytes).unwrap_err();
        assert_eq!(err, StateError::Desync { section: "First".into() });
        assert_eq!(target, before);
    }

    #[test]
    fn subsystem_rejection_aborts_load() {
        let mut source = Pair { first: 1, second: vec![], accept: true };
        let bytes = save_state(&mut source).expect("save");

        let mut target = Pair::default();
        let err = load_state(&mut target, &bytes).unwrap_err();
        assert_eq!(err, StateError::SubsystemFailed { section: "Second".into() });
    }

    #[test]
    fn truncated_input_is_reported() {
        let mut source = Pair { first: 1, second: vec![5, 6], accept: true };
        let bytes = save_state(&mut source).expect("save");

        let mut target = Pair { accept: true, ..Pair::default() };
        let err = load_state(&mut target, &bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, StateError::Truncated { ref section, .. } if section == "Second"));
    }
}
