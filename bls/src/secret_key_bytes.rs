use derive_more::From;

pub const SIZE: usize = 32;

#[derive(Default, From)]
pub struct SecretKeyBytes {
    bytes: [u8; SIZE],
}

impl AsRef<[u8]> for SecretKeyBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsMut<[u8]> for SecretKeyBytes {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
