//! Encoding and decoding helpers.
//!
//! Wire values and Fiat-Shamir inputs go through the same [`encode`] path,
//! so the bytes a verifier hashes are exactly the bytes that travelled.

use elliptic_curve::group::GroupEncoding;
use elliptic_curve::PrimeField;
use k256::{ProjectivePoint, Scalar};
use prost::Message;

use crate::error::{Error, Result};

/// Encode a wire message into a vec.
pub fn encode<M: Message>(msg: &M) -> Vec<u8> {
    msg.encode_to_vec()
}

/// Decode a wire message from a slice of bytes.
pub fn decode<M: Message + Default>(input: &[u8]) -> Result<M> {
    M::decode(input).map_err(|_| Error::Decoding)
}

/// Conversion between a domain type and its wire message.
///
/// `to_proto` is infallible: a value that exists is encodable. `from_proto`
/// rejects anything that does not decode back to a valid value, so decoded
/// data never needs re-validation.
pub trait Proto: Sized {
    type Message: Message + Default;

    fn to_proto(&self) -> Self::Message;
    fn from_proto(m: &Self::Message) -> Result<Self>;

    /// The canonical byte encoding of this value.
    fn to_bytes(&self) -> Vec<u8> {
        encode(&self.to_proto())
    }

    /// Decodes a value from its canonical byte encoding.
    fn from_bytes(input: &[u8]) -> Result<Self> {
        Self::from_proto(&decode(input)?)
    }
}

const POINT_LEN: usize = 33;
const SCALAR_LEN: usize = 32;

/// Serialize a point into its 33-byte compressed encoding.
pub fn point_to_bytes(p: &ProjectivePoint) -> Vec<u8> {
    p.to_bytes().to_vec()
}

/// Deserialize a point, rejecting non-canonical encodings and encodings of
/// values outside the group.
pub fn point_from_bytes(input: &[u8]) -> Result<ProjectivePoint> {
    if input.len() != POINT_LEN {
        return Err(Error::Decoding);
    }
    let repr = k256::CompressedPoint::clone_from_slice(input);
    Option::from(ProjectivePoint::from_bytes(&repr)).ok_or(Error::Decoding)
}

/// Serialize a scalar into its 32-byte big-endian encoding.
pub fn scalar_to_bytes(s: &Scalar) -> Vec<u8> {
    s.to_bytes().to_vec()
}

/// Deserialize a scalar, rejecting non-canonical (unreduced) encodings.
pub fn scalar_from_bytes(input: &[u8]) -> Result<Scalar> {
    if input.len() != SCALAR_LEN {
        return Err(Error::Decoding);
    }
    let repr = k256::FieldBytes::clone_from_slice(input);
    Option::from(Scalar::from_repr(repr)).ok_or(Error::Decoding)
}

pub fn points_to_bytes(ps: &[ProjectivePoint]) -> Vec<Vec<u8>> {
    ps.iter().map(point_to_bytes).collect()
}

pub fn points_from_bytes(input: &[Vec<u8>]) -> Result<Vec<ProjectivePoint>> {
    input.iter().map(|b| point_from_bytes(b)).collect()
}

pub fn scalars_to_bytes(ss: &[Scalar]) -> Vec<Vec<u8>> {
    ss.iter().map(scalar_to_bytes).collect()
}

pub fn scalars_from_bytes(input: &[Vec<u8>]) -> Result<Vec<Scalar>> {
    input.iter().map(|b| scalar_from_bytes(b)).collect()
}

#[cfg(test)]
mod test {
    use elliptic_curve::Group;
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_point_roundtrip() {
        let p = ProjectivePoint::random(&mut OsRng);
        let bytes = point_to_bytes(&p);
        assert_eq!(bytes.len(), POINT_LEN);
        assert_eq!(point_from_bytes(&bytes).unwrap(), p);
    }

    #[test]
    fn test_scalar_roundtrip() {
        let s = Scalar::generate_biased(&mut OsRng);
        let bytes = scalar_to_bytes(&s);
        assert_eq!(bytes.len(), SCALAR_LEN);
        assert_eq!(scalar_from_bytes(&bytes).unwrap(), s);
    }

    #[test]
    fn test_bad_lengths_are_rejected() {
        assert_eq!(point_from_bytes(&[0u8; 32]), Err(Error::Decoding));
        assert_eq!(scalar_from_bytes(&[0u8; 33]), Err(Error::Decoding));
    }

    #[test]
    fn test_unreduced_scalar_is_rejected() {
        let bytes = [0xffu8; 32];
        assert_eq!(scalar_from_bytes(&bytes), Err(Error::Decoding));
    }
}
