/// [Szudzik pairing function][szudzik]: a bijection from pairs of
/// naturals to naturals, used as a cheap perfect hash for node triples.
///
/// ```text
/// (a, b) -> if (a < b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub trait MyHash {
    /// Hash function used for the unique table and the computed table.
    fn hash(&self) -> u64;
}

impl MyHash for u64 {
    fn hash(&self) -> u64 {
        *self
    }
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        pairing3(self.0, self.1, self.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing2() {
        // a\b  0  1  2  3  4
        // ------------------
        // 0    0  1  4  9 16
        // 1    2  3  5 10 17
        // 2    6  7  8 11 18
        // 3   12 13 14 15 19
        // 4   20 21 22 23 24
        assert_eq!(pairing2(0, 0), 0);
        assert_eq!(pairing2(0, 1), 1);
        assert_eq!(pairing2(1, 0), 2);
        assert_eq!(pairing2(1, 1), 3);
        assert_eq!(pairing2(0, 2), 4);
        assert_eq!(pairing2(2, 2), 8);
        assert_eq!(pairing2(4, 0), 20);
        assert_eq!(pairing2(4, 4), 24);
    }

    #[test]
    fn test_pairing2_distinct() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..32u64 {
            for b in 0..32u64 {
                assert!(seen.insert(pairing2(a, b)), "collision at ({}, {})", a, b);
            }
        }
    }
}
