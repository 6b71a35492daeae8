use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::config::RegisterImage;
use crate::Error;

/// Longest burst: the register address followed by the full settings block.
const MAX_WRITE: usize = 1 + RegisterImage::LEN;

/// I²C access with 8-bit register addresses and big-endian 16-bit words.
/// Consecutive addresses are consecutive words, so a burst of `n` bytes
/// spans `n / 2` addresses.
pub(crate) struct Bus<I> {
  i2c: I,
  address: u8,
}

impl<I, E> Bus<I>
where
  I: I2c<SevenBitAddress, Error = E>,
{
  pub(crate) const fn new(i2c: I, address: u8) -> Self {
    Self { i2c, address }
  }

  // Typed helpers
  pub(crate) async fn read<const N: usize, T: From<[u8; N]>>(&mut self, reg: impl Into<u8>) -> Result<T, Error<E>> {
    let mut b = [0u8; N];
    self.read_bytes(reg, &mut b).await?;
    Ok(T::from(b))
  }

  pub(crate) async fn write<const N: usize, T>(&mut self, reg: impl Into<u8>, v: T) -> Result<(), Error<E>>
  where
    T: Into<[u8; N]>,
  {
    self.write_bytes(reg, &v.into()).await
  }

  pub(crate) async fn read_u16(&mut self, reg: impl Into<u8>) -> Result<u16, Error<E>> {
    let buf: [u8; 2] = self.read(reg).await?;
    Ok(u16::from_be_bytes(buf))
  }

  pub(crate) async fn write_u16(&mut self, reg: impl Into<u8>, value: u16) -> Result<(), Error<E>> {
    self.write_bytes(reg, &value.to_be_bytes()).await
  }

  /// Read-modify-write of the bits in `mask`.
  pub(crate) async fn update_u16(&mut self, reg: impl Into<u8> + Copy, mask: u16, value: u16) -> Result<(), Error<E>> {
    let old = self.read_u16(reg).await?;
    let new = (old & !mask) | (value & mask);
    if new == old {
      return Ok(());
    }
    self.write_u16(reg, new).await
  }

  pub(crate) async fn read_bytes(&mut self, reg: impl Into<u8>, buf: &mut [u8]) -> Result<(), Error<E>> {
    let addr = [reg.into()];
    self.i2c.write_read(self.address, &addr, buf).await.map_err(Error::I2c)
  }

  pub(crate) async fn write_bytes(&mut self, reg: impl Into<u8>, data: &[u8]) -> Result<(), Error<E>> {
    let len = data.len();
    if len >= MAX_WRITE {
      return Err(Error::BufferOverflow);
    }
    let mut buf = [0u8; MAX_WRITE];
    buf[0] = reg.into();
    buf[1..=len].copy_from_slice(data);
    self.i2c.write(self.address, &buf[..=len]).await.map_err(Error::I2c)
  }
}
