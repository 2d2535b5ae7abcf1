pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 48;
pub const COMPRESSED_SIGNATURE_SIZE: usize = 96;

pub const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
