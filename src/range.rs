use crate::error::{ReelError, Result};

/// An inclusive range of verses within one sura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AyahRange {
    pub sura: u32,
    pub start: u32,
    pub end: u32,
}

impl AyahRange {
    pub fn new(sura: u32, start: u32, end: u32) -> Result<Self> {
        if sura == 0 || start == 0 {
            return Err(ReelError::InvalidRange(format!(
                "Sura and ayah numbers start at 1 (got {sura}:{start})"
            )));
        }
        if start > end {
            return Err(ReelError::InvalidRange(format!(
                "Start ayah {start} is after end ayah {end}"
            )));
        }
        Ok(Self { sura, start, end })
    }

    /// Parse `N` or `start-end` for the given sura.
    pub fn parse(sura: u32, spec: &str) -> Result<Self> {
        let (start, end) = parse_bounds(spec)?;
        Self::new(sura, start, end)
    }

    pub fn ayahs(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Label shown next to the chapter name: `7` or `1-7`.
    pub fn label(&self) -> String {
        if self.is_single() {
            self.start.to_string()
        } else {
            format!("{}-{}", self.start, self.end)
        }
    }
}

impl std::fmt::Display for AyahRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.sura, self.label())
    }
}

fn parse_bounds(spec: &str) -> Result<(u32, u32)> {
    let parse_one = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| ReelError::InvalidRange(format!("'{}': {e}", spec.trim())))
    };

    match spec.split_once('-') {
        Some((start, end)) => Ok((parse_one(start)?, parse_one(end)?)),
        None => {
            let ayah = parse_one(spec)?;
            Ok((ayah, ayah))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let range = AyahRange::parse(2, "255").unwrap();
        assert_eq!(range, AyahRange { sura: 2, start: 255, end: 255 });
        assert!(range.is_single());
        assert_eq!(range.label(), "255");
        assert_eq!(range.ayahs().count(), 1);
    }

    #[test]
    fn test_parse_range() {
        let range = AyahRange::parse(1, "1-7").unwrap();
        assert_eq!(range.start, 1);
        assert_eq!(range.end, 7);
        assert_eq!(range.label(), "1-7");
        assert_eq!(range.ayahs().collect::<Vec<_>>(), (1..=7).collect::<Vec<_>>());
        assert_eq!(range.to_string(), "1:1-7");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(AyahRange::parse(1, "abc").is_err());
        assert!(AyahRange::parse(1, "5-2").is_err());
        assert!(AyahRange::parse(1, "0").is_err());
        assert!(AyahRange::parse(0, "1").is_err());
        assert!(AyahRange::parse(1, "1-").is_err());
    }
}
