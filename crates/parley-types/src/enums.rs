//! Policy selectors for the Parley negotiation engine.
//!
//! Each enumeration picks one sub-model of the engine: how utility
//! differences become votes, how coalition strengths become victory
//! probabilities, how pairwise probabilities are condensed into a
//! distribution over options, how committed third parties are, how bargains
//! interpolate, and how risk attitudes are inferred and shared.
//!
//! Every selector has a canonical lowercase token used in configuration
//! files and on the command line. Unrecognized tokens are rejected with a
//! [`ParseTokenError`] at the point of use; they are never silently mapped
//! to a default.

use serde::{Deserialize, Serialize};

/// An unrecognized configuration token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} token: {token:?}")]
pub struct ParseTokenError {
    /// Which selector was being parsed (e.g. `voting rule`).
    pub kind: &'static str,
    /// The offending token as supplied.
    pub token: String,
}

/// Implements the token round-trip (`FromStr`, `Display`, serde) for a
/// fieldless selector enum.
macro_rules! token_enum {
    (
        $name:ident, $kind:literal,
        { $($variant:ident => $token:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        impl $name {
            /// Canonical configuration token for this value.
            pub const fn token(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.token())
            }
        }

        impl core::str::FromStr for $name {
            type Err = ParseTokenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_ascii_lowercase();
                match lowered.as_str() {
                    $($token $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(ParseTokenError {
                        kind: $kind,
                        token: s.to_owned(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseTokenError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.token()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

/// How an actor converts a utility difference into a signed vote.
///
/// For a weight `w` and utility difference `du = u_a - u_b`, with `sgn`
/// the thresholded sign of `du`:
///
/// | Rule           | Vote                    |
/// |----------------|-------------------------|
/// | `Binary`       | `w * sgn`               |
/// | `PropBin`      | `w * (du + sgn) / 2`    |
/// | `Proportional` | `w * du`                |
/// | `PropCbc`      | `w * (du + du^3) / 2`   |
/// | `Cubic`        | `w * du^3`              |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum VotingRule {
    /// Full weight behind any strict preference.
    Binary,
    /// Average of binary and proportional responses.
    PropBin,
    /// Vote proportional to the utility difference.
    #[default]
    Proportional,
    /// Average of proportional and cubic responses.
    PropCbc,
    /// Vote proportional to the cubed utility difference.
    Cubic,
}

token_enum!(VotingRule, "voting rule", {
    Binary => "binary",
    PropBin => "prop_bin" | "propbin",
    Proportional => "proportional" | "prop",
    PropCbc => "prop_cbc" | "propcbc",
    Cubic => "cubic",
});

/// How coalition strengths become a pairwise victory probability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum VictoryModel {
    /// `P[a > b] = c_ab / (c_ab + c_ba)`.
    #[default]
    Linear,
    /// `P[a > b] = c_ab^2 / (c_ab^2 + c_ba^2)`.
    Square,
}

token_enum!(VictoryModel, "victory model", {
    Linear => "linear",
    Square => "square",
});

/// How a matrix of pairwise victory probabilities is condensed into a
/// probability distribution over options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum PceModel {
    /// Probability that an option beats every alternative, conditioned on
    /// exactly one option doing so.
    #[default]
    Conditional,
    /// Stationary distribution of a chain in which a uniformly chosen
    /// challenger displaces the incumbent with its victory probability.
    Markov,
}

token_enum!(PceModel, "PCE model", {
    Conditional => "conditional" | "cond",
    Markov => "markov",
});

/// How strongly third parties commit to the side they favor in a pairwise
/// contest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ThirdPartyCommit {
    /// Third parties vote in proportion to how much of their own
    /// position's value the favored side would keep.
    NoCommit,
    /// Third parties commit in proportion to the chance their favored side
    /// prevails once they join it.
    #[default]
    Semi,
    /// Third parties commit their whole vote.
    Full,
}

token_enum!(ThirdPartyCommit, "third-party commitment", {
    NoCommit => "no_commit" | "none",
    Semi => "semi",
    Full => "full",
});

// ---------------------------------------------------------------------------
// Bargaining
// ---------------------------------------------------------------------------

/// Per-dimension interpolation used to build a compromise bargain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum InterpolationPolicy {
    /// Weights `salience * probability`.
    S1P1,
    /// Weights `salience^2 * probability^2`.
    #[default]
    S2P2,
    /// Each side concedes by the margin the other side's probability
    /// exceeds its own, scaled by relative squared salience.
    S2PMax,
}

token_enum!(InterpolationPolicy, "interpolation policy", {
    S1P1 => "s1p1",
    S2P2 => "s2p2",
    S2PMax => "s2pmax",
});

// ---------------------------------------------------------------------------
// Risk attitudes
// ---------------------------------------------------------------------------

/// Range onto which coalition-equilibrium probabilities are mapped when
/// inferring risk attitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum RiskRange {
    /// `[0, +1]`.
    Min,
    /// `[-1/2, +1]`.
    #[default]
    Mid,
    /// `[-1, +1]`.
    Max,
}

token_enum!(RiskRange, "risk range", {
    Min => "min",
    Mid => "mid",
    Max => "max",
});

/// How a perspective holder estimates another actor's risk attitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum RiskAdjust {
    /// The holder uses the target's own risk attitude.
    Full,
    /// The holder averages its own and the target's risk attitudes.
    #[default]
    Half,
    /// The holder projects its own risk attitude onto the target.
    Own,
}

token_enum!(RiskAdjust, "risk adjustment", {
    Full => "full",
    Half => "half",
    Own => "own" | "none",
});

// ---------------------------------------------------------------------------
// Perspective
// ---------------------------------------------------------------------------

/// Whose utility estimates are used when computing a probability
/// distribution over actors' positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    /// Every utility comes from the given actor's estimates.
    Actor(usize),
    /// Each actor's row comes from that actor's own estimates.
    Own,
}

impl core::fmt::Display for Perspective {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Actor(index) => write!(f, "{index}"),
            Self::Own => f.write_str("own"),
        }
    }
}

impl core::str::FromStr for Perspective {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("own") {
            return Ok(Self::Own);
        }
        trimmed
            .parse::<usize>()
            .map(Self::Actor)
            .map_err(|_parse| ParseTokenError {
                kind: "perspective",
                token: s.to_owned(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for rule in [
            VotingRule::Binary,
            VotingRule::PropBin,
            VotingRule::Proportional,
            VotingRule::PropCbc,
            VotingRule::Cubic,
        ] {
            assert_eq!(rule.token().parse::<VotingRule>().unwrap(), rule);
        }
        for policy in [
            InterpolationPolicy::S1P1,
            InterpolationPolicy::S2P2,
            InterpolationPolicy::S2PMax,
        ] {
            assert_eq!(policy.to_string().parse::<InterpolationPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn parsing_is_case_insensitive_and_accepts_aliases() {
        assert_eq!("PROP".parse::<VotingRule>().unwrap(), VotingRule::Proportional);
        assert_eq!(" S2PMax ".parse::<InterpolationPolicy>().unwrap(), InterpolationPolicy::S2PMax);
        assert_eq!("none".parse::<RiskAdjust>().unwrap(), RiskAdjust::Own);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = "majority".parse::<VotingRule>().unwrap_err();
        assert_eq!(err.kind, "voting rule");
        assert_eq!(err.token, "majority");
        assert!(err.to_string().contains("majority"));
    }

    #[test]
    fn serde_uses_tokens() {
        let json = serde_json::to_string(&PceModel::Markov).unwrap();
        assert_eq!(json, "\"markov\"");
        let back: RiskRange = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(back, RiskRange::Max);
        assert!(serde_json::from_str::<RiskRange>("\"huge\"").is_err());
    }

    #[test]
    fn perspective_parses_index_or_own() {
        assert_eq!("own".parse::<Perspective>().unwrap(), Perspective::Own);
        assert_eq!("3".parse::<Perspective>().unwrap(), Perspective::Actor(3));
        assert!("-1".parse::<Perspective>().is_err());
    }

    #[test]
    fn defaults_match_reference_configuration() {
        assert_eq!(VotingRule::default(), VotingRule::Proportional);
        assert_eq!(ThirdPartyCommit::default(), ThirdPartyCommit::Semi);
        assert_eq!(InterpolationPolicy::default(), InterpolationPolicy::S2P2);
        assert_eq!(RiskRange::default(), RiskRange::Mid);
        assert_eq!(RiskAdjust::default(), RiskAdjust::Half);
    }
}
