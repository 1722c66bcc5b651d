//! Shared random numbers.
//!
//! A named rng is specified by a dice expression (`1d6`, `2d10+3`, ...).
//! Each party contributes a random mask as entropy; once every party has
//! also revealed its decryption share, the unmasked point seeds an XOF and
//! the expression samples from that stream. Every party reads the same
//! stream, so every party computes the same value.

use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use crate::mask::Mask;
use crate::vtmf::{Share, Vtmf};

use k256::ProjectivePoint;

/// The state of one shared random number.
#[derive(Clone, Debug)]
pub struct Rng {
    parties: usize,
    spec: spec::Expr,
    entropy: Mask,
    entropy_fp: Vec<Fingerprint>,
    secret: Share,
    secret_fp: Vec<Fingerprint>,
}

impl Rng {
    /// Creates an rng distributed over `parties` parties.
    pub fn new(parties: usize, spec: &str) -> Result<Self> {
        Ok(Self {
            parties,
            spec: spec.parse()?,
            entropy: Mask::identity(),
            entropy_fp: Vec::new(),
            secret: ProjectivePoint::IDENTITY,
            secret_fp: Vec::new(),
        })
    }

    /// The spec string this rng was created with.
    pub fn spec(&self) -> String {
        self.spec.to_string()
    }

    /// The accumulated entropy mask.
    pub fn mask(&self) -> &Mask {
        &self.entropy
    }

    /// Folds in one party's entropy.
    pub fn add_entropy(&mut self, party: Fingerprint, mask: &Mask) {
        self.entropy += *mask;
        self.entropy_fp.push(party);
    }

    /// Folds in one party's reveal share.
    pub fn add_secret(&mut self, party: Fingerprint, share: &Share) {
        self.secret += share;
        self.secret_fp.push(party);
    }

    /// The parties that have contributed entropy.
    pub fn entropy_parties(&self) -> &[Fingerprint] {
        &self.entropy_fp
    }

    /// The parties that have revealed their shares.
    pub fn secret_parties(&self) -> &[Fingerprint] {
        &self.secret_fp
    }

    /// Whether every party has contributed entropy.
    pub fn is_generated(&self) -> bool {
        self.entropy_fp.len() == self.parties
    }

    /// Whether every party has revealed its share.
    pub fn is_revealed(&self) -> bool {
        self.secret_fp.len() == self.parties
    }

    /// Computes the value.
    ///
    /// Deterministic: any party with the full entropy and shares gets the
    /// same answer.
    pub fn value(&self, vtmf: &Vtmf) -> Result<u64> {
        if !self.is_revealed() {
            return Err(Error::ExhaustedRecovery);
        }
        let unmasked = vtmf.unmask_share(&self.entropy, &self.secret);
        let mut xof = vtmf.unmask_random(&unmasked);
        Ok(self.spec.sample(&mut xof))
    }
}

impl Display for Rng {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

mod spec {
    //! The dice-expression grammar:
    //!
    //! ```text
    //! expr     = term (('+'|'-') term)*
    //! term     = dice | constant
    //! dice     = nonzero 'd' nonzero
    //! constant = '0' | [1-9][0-9]*
    //! nonzero  = [1-9][0-9]*
    //! ```

    use std::fmt::{self, Display, Formatter};
    use std::str::FromStr;

    use nom::branch::alt;
    use nom::character::complete::{char, digit1, one_of};
    use nom::combinator::{all_consuming, map, map_res, verify};
    use nom::multi::many0;
    use nom::sequence::{pair, separated_pair};
    use nom::IResult;

    use crate::error::Error;
    use crate::hash::Xof;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(super) enum Term {
        Const(u64),
        Dice { n: u64, d: u64 },
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(super) enum Op {
        Add,
        Sub,
    }

    /// A parsed dice expression.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(super) struct Expr {
        first: Term,
        rest: Vec<(Op, Term)>,
    }

    impl Term {
        fn sample(&self, xof: &mut Xof) -> u64 {
            match *self {
                Term::Const(k) => k,
                Term::Dice { n, d } => (0..n).map(|_| roll(d, xof)).sum(),
            }
        }
    }

    /// One uniform draw from `1..=d` by rejection.
    fn roll(d: u64, xof: &mut Xof) -> u64 {
        let limit = u64::MAX - u64::MAX % d;
        loop {
            let mut buf = [0u8; 8];
            xof.read(&mut buf);
            let x = u64::from_be_bytes(buf);
            if x < limit {
                return 1 + x % d;
            }
        }
    }

    impl Expr {
        pub(super) fn sample(&self, xof: &mut Xof) -> u64 {
            let mut acc = self.first.sample(xof);
            for (op, term) in &self.rest {
                let v = term.sample(xof);
                acc = match op {
                    Op::Add => acc + v,
                    Op::Sub => acc.saturating_sub(v),
                };
            }
            acc
        }
    }

    fn number(input: &str) -> IResult<&str, u64> {
        map_res(
            verify(digit1, |s: &str| s == "0" || !s.starts_with('0')),
            u64::from_str,
        )(input)
    }

    fn nonzero(input: &str) -> IResult<&str, u64> {
        verify(number, |&n| n > 0)(input)
    }

    fn dice(input: &str) -> IResult<&str, Term> {
        map(separated_pair(nonzero, char('d'), nonzero), |(n, d)| {
            Term::Dice { n, d }
        })(input)
    }

    fn term(input: &str) -> IResult<&str, Term> {
        alt((dice, map(number, Term::Const)))(input)
    }

    fn op(input: &str) -> IResult<&str, Op> {
        map(one_of("+-"), |c| match c {
            '+' => Op::Add,
            _ => Op::Sub,
        })(input)
    }

    fn expr(input: &str) -> IResult<&str, Expr> {
        map(pair(term, many0(pair(op, term))), |(first, rest)| Expr {
            first,
            rest,
        })(input)
    }

    impl FromStr for Expr {
        type Err = Error;

        fn from_str(input: &str) -> Result<Self, Error> {
            all_consuming(expr)(input)
                .map(|(_, e)| e)
                .map_err(|_| Error::BadSpec)
        }
    }

    impl Display for Term {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            match self {
                Term::Const(k) => write!(f, "{}", k),
                Term::Dice { n, d } => write!(f, "{}d{}", n, d),
            }
        }
    }

    impl Display for Expr {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            write!(f, "{}", self.first)?;
            for (op, term) in &self.rest {
                let sign = match op {
                    Op::Add => '+',
                    Op::Sub => '-',
                };
                write!(f, "{}{}", sign, term)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::spec::Expr;
    use super::*;
    use crate::hash::Xof;

    fn xof(seed: &[u8]) -> Xof {
        Xof::new(b"rng test", seed)
    }

    fn eval(s: &str, seed: &[u8]) -> u64 {
        s.parse::<Expr>().unwrap().sample(&mut xof(seed))
    }

    #[test]
    fn test_grammar_accepts_spec_forms() {
        for ok in ["0", "7", "1d6", "2d10", "1d6+2", "3d4-1", "1d6+1d8+5"] {
            assert!(ok.parse::<Expr>().is_ok(), "{ok} should parse");
        }
        for bad in ["", "d6", "0d6", "1d0", "1d", "6+", "1d6 + 2", "007", "-1"] {
            assert!(bad.parse::<Expr>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_spec_roundtrips_via_display() {
        for s in ["0", "1d6", "2d10+3", "1d6+1d8-2"] {
            let parsed: Expr = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn test_dice_stay_in_range() {
        for i in 0..64u8 {
            let v = eval("1d6", &[i]);
            assert!((1..=6).contains(&v), "1d6 gave {v}");

            let v = eval("2d4", &[i, 1]);
            assert!((2..=8).contains(&v), "2d4 gave {v}");
        }
    }

    #[test]
    fn test_constants_and_ops() {
        assert_eq!(eval("7", b"x"), 7);
        let v = eval("1d6+2", b"y");
        assert!((3..=8).contains(&v));
        // saturating: a constant larger than the roll floors at zero
        assert_eq!(eval("1d1-5", b"z"), 0);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        assert_eq!(eval("4d20+7", b"seed"), eval("4d20+7", b"seed"));
    }

    #[test]
    fn test_rng_tracks_parties() {
        let mut rng = Rng::new(2, "1d6").unwrap();
        assert!(!rng.is_generated());

        let fp0 = Fingerprint::of_bytes(b"test", b"p0");
        let fp1 = Fingerprint::of_bytes(b"test", b"p1");
        rng.add_entropy(fp0, &Mask::identity());
        assert!(!rng.is_generated());
        rng.add_entropy(fp1, &Mask::identity());
        assert!(rng.is_generated());
        assert!(!rng.is_revealed());
        assert_eq!(rng.entropy_parties(), &[fp0, fp1]);
    }

    #[test]
    fn test_bad_specs_are_rejected() {
        assert!(Rng::new(2, "xd6").is_err());
        assert!(Rng::new(2, "1d6").is_ok());
    }
}
