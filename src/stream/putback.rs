/// One byte of read-back storage.
///
/// Holds at most one byte. Storing over a pending byte is only possible
/// through [`store`](Self::store), which the read paths use after they have
/// already handed the old byte out; [`push`](Self::push) refuses instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutbackSlot {
    byte: Option<u8>,
}

impl PutbackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.byte.is_some()
    }

    /// The pending byte, left in place.
    pub fn peek(&self) -> Option<u8> {
        self.byte
    }

    /// The pending byte, removed.
    pub fn take(&mut self) -> Option<u8> {
        self.byte.take()
    }

    pub fn store(&mut self, byte: u8) {
        self.byte = Some(byte);
    }

    /// Returns `false` without touching the slot if a byte is pending.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_pending() {
            return false;
        }
        self.byte = Some(byte);
        true
    }

    pub fn clear(&mut self) {
        self.byte = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_holds_exactly_one_byte() {
        let mut slot = PutbackSlot::new();
        assert!(slot.push(b'a'));
        assert!(!slot.push(b'b'));
        assert_eq!(slot.peek(), Some(b'a'));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut slot = PutbackSlot::new();
        slot.store(b'x');
        assert_eq!(slot.peek(), Some(b'x'));
        assert_eq!(slot.peek(), Some(b'x'));
        assert_eq!(slot.take(), Some(b'x'));
        assert!(!slot.is_pending());
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn clear_empties_the_slot() {
        let mut slot = PutbackSlot::new();
        slot.store(0);
        slot.clear();
        assert!(!slot.is_pending());
        assert!(slot.push(1));
    }
}
