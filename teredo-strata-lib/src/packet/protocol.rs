//! Teredo discriminator values
//!
//! The first 16 bits after the UDP header, and again after an Authentication
//! header, select what follows: `0x0001` introduces an Authentication header,
//! `0x0000` an Origin Indication, and anything else is the key used to pick a
//! payload handler.
//!
//! # Examples
//!
//! ```
//! use teredo_strata::packet::protocol::PayloadKey;
//!
//! assert_eq!(format!("{}", PayloadKey::IPV6), "ipv6");
//! assert_eq!(format!("{}", PayloadKey::ORIGIN_INDICATION), "origin-indication");
//! assert_eq!(format!("{}", PayloadKey::from(0x6000)), "0x6000");
//!
//! let key: PayloadKey = "ipv6".parse().unwrap();
//! assert_eq!(u16::from(key), 0x86DD);
//! assert!(key.is_known());
//! assert!(!PayloadKey::from(0x1234).is_known());
//! ```

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, U16};

crate::discriminator_constants! {
    PayloadKey:
        ORIGIN_INDICATION = 0x0000;
        AUTHENTICATION = 0x0001;
        IPV6 = 0x86DD;
}
