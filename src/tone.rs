use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Writing tone accepted by `/api/generate`. The labels are sent verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Professionnel,
    Amical,
    #[serde(rename = "Drôle")]
    Drole,
    Inspirant,
}

impl Tone {
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Professionnel => "Professionnel",
            Tone::Amical => "Amical",
            Tone::Drole => "Drôle",
            Tone::Inspirant => "Inspirant",
        }
    }

    pub fn all() -> [Tone; 4] {
        [Tone::Professionnel, Tone::Amical, Tone::Drole, Tone::Inspirant]
    }

    fn index(&self) -> usize {
        Self::all().iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Tone {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(&self) -> Tone {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('ô', "o");
        Self::all()
            .into_iter()
            .find(|tone| tone.label().to_lowercase().replace('ô', "o") == wanted)
            .ok_or_else(|| {
                let labels: Vec<&str> = Self::all().iter().map(Tone::label).collect();
                format!("unknown tone '{}', expected one of: {}", s, labels.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_wire_label() {
        assert_eq!(serde_json::to_string(&Tone::Drole).unwrap(), "\"Drôle\"");
        assert_eq!(serde_json::to_string(&Tone::Amical).unwrap(), "\"Amical\"");
    }

    #[test]
    fn parses_loosely() {
        assert_eq!("drole".parse::<Tone>().unwrap(), Tone::Drole);
        assert_eq!("Drôle".parse::<Tone>().unwrap(), Tone::Drole);
        assert_eq!(" INSPIRANT ".parse::<Tone>().unwrap(), Tone::Inspirant);
        assert!("sarcastique".parse::<Tone>().is_err());
    }

    #[test]
    fn cycling_wraps_both_ways() {
        assert_eq!(Tone::Inspirant.next(), Tone::Professionnel);
        assert_eq!(Tone::Professionnel.prev(), Tone::Inspirant);
        let mut tone = Tone::default();
        for _ in 0..Tone::all().len() {
            tone = tone.next();
        }
        assert_eq!(tone, Tone::default());
    }
}
