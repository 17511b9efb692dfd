use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENDPOINT_RE: Regex = Regex::new(
        r"^([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*))?(?:\[\s*(\d+)\s*(?::\s*(\d+)\s*)?\])?$"
    )
    .unwrap();
}

/// One end of a wire: `component[.port][[hi:lo] | [bit]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub component: String,
    pub port: Option<String>,
    /// Inclusive `(hi, lo)` bit range.
    pub bits: Option<(usize, usize)>,
}

impl Endpoint {
    pub fn parse(text: &str) -> Option<Endpoint> {
        let captures = ENDPOINT_RE.captures(text.trim())?;
        let component = captures[1].to_string();
        let port = captures.get(2).map(|m| m.as_str().to_string());
        let bits = match (captures.get(3), captures.get(4)) {
            (Some(hi), Some(lo)) => Some((hi.as_str().parse().ok()?, lo.as_str().parse().ok()?)),
            (Some(bit), None) => {
                let bit = bit.as_str().parse().ok()?;
                Some((bit, bit))
            }
            _ => None,
        };
        Some(Endpoint {
            component,
            port,
            bits,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component)?;
        if let Some(port) = &self.port {
            write!(f, ".{port}")?;
        }
        match self.bits {
            Some((hi, lo)) if hi == lo => write!(f, "[{hi}]"),
            Some((hi, lo)) => write!(f, "[{hi}:{lo}]"),
            None => Ok(()),
        }
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    Endpoint::parse(name).is_some_and(|e| e.port.is_none() && e.bits.is_none() && e.component == name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn forms() {
        assert_eq!(
            Endpoint::parse("alu.result[31:20]"),
            Some(Endpoint {
                component: "alu".into(),
                port: Some("result".into()),
                bits: Some((31, 20)),
            })
        );
        assert_eq!(
            Endpoint::parse("pc[2]").map(|e| e.bits),
            Some(Some((2, 2)))
        );
        assert_eq!(Endpoint::parse("clk").map(|e| e.port), Some(None));
        assert_eq!(Endpoint::parse("rf.x0").unwrap().to_string(), "rf.x0");
        for bad in ["", "1abc", "a.", "a[3:]", "a.b.c", "a[x]", "a b"] {
            assert_eq!(Endpoint::parse(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("read_data1"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(" a"));
    }
}
