use thiserror::Error;

use crate::constants::{Word, MEMORY_WORDS};

/// Errors raised by the memory subsystem.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The program counter points outside of memory. Fetch does not wrap.
    #[error("instruction fetch at {address:#010x} is outside memory")]
    FetchOutOfBounds { address: Word },

    /// A loaded program would run past the end of memory.
    #[error("a program of {words} words does not fit at offset {offset}")]
    ProgramTooLarge { offset: usize, words: usize },
}

/// A fixed-capacity array of words, shared by instruction fetch and data
/// access (a von-Neumann layout: self-modifying programs are possible).
///
/// The two access paths deliberately do not agree on addressing. Fetch is
/// word-indexed (`pc / 4`, no wraparound); loads and stores index the same
/// array with the raw byte address modulo the capacity. This mismatch is the
/// documented contract of the machine, kept bit-for-bit; see DESIGN.md.
pub struct Memory {
    words: Vec<Word>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ {} words }}", self.words.len())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(MEMORY_WORDS)
    }
}

impl Memory {
    /// Allocates a zeroed memory of `capacity` words. The capacity never
    /// changes afterwards.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity],
        }
    }

    /// Capacity in words.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Fetches the instruction word at byte address `pc`.
    ///
    /// # Errors
    ///
    /// Fails when `pc / 4` is outside the word array.
    pub fn fetch(&self, pc: Word) -> Result<Word, MemoryError> {
        self.words
            .get((pc / 4) as usize)
            .copied()
            .ok_or(MemoryError::FetchOutOfBounds { address: pc })
    }

    /// Reads the word a load addresses: the raw byte address is used as a
    /// word index, modulo the capacity.
    #[must_use]
    pub fn read(&self, address: Word) -> Word {
        self.words[address as usize % self.words.len()]
    }

    /// Writes the word a store addresses, with the same indexing as
    /// [`Memory::read`].
    pub fn write(&mut self, address: Word, value: Word) {
        let index = address as usize % self.words.len();
        self.words[index] = value;
    }

    /// Looks at a word by index, for inspection tooling.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Word> {
        self.words.get(index).copied()
    }

    /// Copies `program` into memory starting at `offset` (a word index).
    ///
    /// # Errors
    ///
    /// Fails when the program would run past the end of memory; nothing is
    /// written in that case.
    pub fn load_program(&mut self, offset: usize, program: &[Word]) -> Result<(), MemoryError> {
        let end = offset.checked_add(program.len()).filter(|end| *end <= self.words.len());
        let Some(end) = end else {
            return Err(MemoryError::ProgramTooLarge {
                offset,
                words: program.len(),
            });
        };
        self.words[offset..end].copy_from_slice(program);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fetch_is_word_indexed() {
        let mut memory = Memory::new(4);
        memory.load_program(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(memory.fetch(0), Ok(1));
        assert_eq!(memory.fetch(4), Ok(2));
        assert_eq!(memory.fetch(12), Ok(4));
    }

    #[test]
    fn fetch_does_not_wrap() {
        let memory = Memory::new(4);
        assert_eq!(
            memory.fetch(16),
            Err(MemoryError::FetchOutOfBounds { address: 16 })
        );
    }

    #[test]
    fn data_access_wraps_modulo_capacity() {
        let mut memory = Memory::new(8);
        memory.write(1, 0xDEAD_BEEF);
        assert_eq!(memory.read(1), 0xDEAD_BEEF);
        // 9 % 8 lands on the same word
        assert_eq!(memory.read(9), 0xDEAD_BEEF);

        memory.write(17, 7);
        assert_eq!(memory.read(1), 7);
    }

    #[test]
    fn load_program_checks_capacity() {
        let mut memory = Memory::new(4);
        assert_eq!(memory.load_program(1, &[1, 2, 3]), Ok(()));
        assert_eq!(memory.fetch(4), Ok(1));

        assert_eq!(
            memory.load_program(2, &[1, 2, 3]),
            Err(MemoryError::ProgramTooLarge { offset: 2, words: 3 })
        );
    }
}
