use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};

use crate::state::PointerWrap;

/// A value that can be walked by a [`PointerWrap`] in either direction.
///
/// The set of implementations is closed over the shapes a save state needs:
/// little-endian scalars, `bool` as one byte, fixed arrays, count-prefixed
/// sequences, sorted maps and sets, optionals, pairs and atomics. Anything
/// else is written as an explicit field sequence by its owner.
pub trait DoState {
    fn do_state(&mut self, p: &mut PointerWrap<'_>);
}

macro_rules! impl_do_state_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DoState for $ty {
                fn do_state(&mut self, p: &mut PointerWrap<'_>) {
                    let mut bytes = self.to_le_bytes();
                    p.do_bytes(&mut bytes);
                    if p.is_read() {
                        *self = <$ty>::from_le_bytes(bytes);
                    }
                }
            }
        )*
    };
}

impl_do_state_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl DoState for bool {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        // Always one byte on disk regardless of the host's bool.
        let mut stable = u8::from(*self);
        stable.do_state(p);
        if p.is_read() {
            *self = stable != 0;
        }
    }
}

impl<T: DoState, const N: usize> DoState for [T; N] {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        p.do_array(self);
    }
}

impl<T: DoState + Default> DoState for Vec<T> {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let count = p.do_count(self.len());
        if p.is_read() {
            self.clear();
            self.resize_with(count, T::default);
        }
        p.do_array(self);
    }
}

impl<T: DoState + Default> DoState for VecDeque<T> {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let count = p.do_count(self.len());
        if p.is_read() {
            self.clear();
            self.resize_with(count, T::default);
        }
        for value in self.iter_mut() {
            value.do_state(p);
        }
    }
}

impl DoState for String {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let mut bytes = std::mem::take(self).into_bytes();
        p.do_byte_vec(&mut bytes);
        *self = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
    }
}

impl<K, V> DoState for BTreeMap<K, V>
where
    K: DoState + Default + Ord + Clone,
    V: DoState + Default,
{
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let count = p.do_count(self.len());
        if p.is_read() {
            self.clear();
            for _ in 0..count {
                let mut key = K::default();
                let mut value = V::default();
                key.do_state(p);
                value.do_state(p);
                self.insert(key, value);
            }
        } else {
            for (key, value) in self.iter_mut() {
                // Keys are immutable inside the map; a write pass never changes them.
                let mut key = key.clone();
                key.do_state(p);
                value.do_state(p);
            }
        }
    }
}

impl<T> DoState for BTreeSet<T>
where
    T: DoState + Default + Ord + Clone,
{
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let count = p.do_count(self.len());
        if p.is_read() {
            self.clear();
            for _ in 0..count {
                let mut value = T::default();
                value.do_state(p);
                self.insert(value);
            }
        } else {
            for value in self.iter() {
                let mut value = value.clone();
                value.do_state(p);
            }
        }
    }
}

impl<T: DoState + Default> DoState for Option<T> {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        let mut present = self.is_some();
        present.do_state(p);
        if p.is_read() {
            *self = if present { Some(T::default()) } else { None };
        }
        if let Some(value) = self.as_mut() {
            value.do_state(p);
        }
    }
}

impl<A: DoState, B: DoState> DoState for (A, B) {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.0.do_state(p);
        self.1.do_state(p);
    }
}

impl DoState for AtomicBool {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.get_mut().do_state(p);
    }
}

impl DoState for AtomicU32 {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.get_mut().do_state(p);
    }
}

impl DoState for AtomicU64 {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.get_mut().do_state(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write<T: DoState>(value: &mut T) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut p = PointerWrap::writer(&mut buf);
        p.transfer(value);
        buf
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(write(&mut 0x1122_3344u32), vec![0x44, 0x33, 0x22, 0x11]);
        assert_eq!(write(&mut -2i16), vec![0xFE, 0xFF]);
    }

    #[test]
    fn bool_is_one_byte_and_nonzero_reads_true() {
        assert_eq!(write(&mut true), vec![1]);
        let input = [7u8];
        let mut value = false;
        PointerWrap::reader(&input).transfer(&mut value);
        assert!(value);
    }

    #[test]
    fn containers_are_count_prefixed() {
        let mut values = vec![0xAAu8, 0xBB];
        assert_eq!(write(&mut values), vec![2, 0, 0, 0, 0xAA, 0xBB]);

        let mut text = String::from("SI");
        assert_eq!(write(&mut text), vec![2, 0, 0, 0, b'S', b'I']);
    }

    #[test]
    fn optional_writes_presence_flag() {
        assert_eq!(write(&mut None::<u16>), vec![0]);
        assert_eq!(write(&mut Some(0x0102u16)), vec![1, 0x02, 0x01]);
    }

    #[test]
    fn map_is_written_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert(2u8, 20u8);
        map.insert(1u8, 10u8);
        assert_eq!(write(&mut map), vec![2, 0, 0, 0, 1, 10, 2, 20]);
    }

    #[test]
    fn read_replaces_existing_container_contents() {
        let mut set: BTreeSet<u32> = [5, 6].into_iter().collect();
        let buf = write(&mut set);

        let mut target: BTreeSet<u32> = [1, 2, 3].into_iter().collect();
        PointerWrap::reader(&buf).transfer(&mut target);
        assert_eq!(target, set);

        let mut deque: VecDeque<u16> = [9, 8].into_iter().collect();
        let buf = write(&mut deque);
        let mut target = VecDeque::from(vec![1u16]);
        PointerWrap::reader(&buf).transfer(&mut target);
        assert_eq!(target, deque);
    }
}
