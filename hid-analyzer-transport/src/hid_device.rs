//! hidapi-backed transport

use parking_lot::Mutex;
use tracing::debug;

use hidapi::HidDevice;

use crate::error::TransportError;
use crate::Transport;

/// Transport over two handles to the same device path
///
/// The input handle belongs to the receive loop and the control handle to the
/// output/feature worker, so one read and one write can be outstanding at the
/// same time.
pub struct HidTransport {
    input: Mutex<HidDevice>,
    control: Mutex<HidDevice>,
    /// Device prefixes input reports with a report id
    numbered_reports: bool,
}

impl HidTransport {
    /// Create a transport from two handles opened on one path
    ///
    /// # Arguments
    /// * `input` - Handle used only for input reads
    /// * `control` - Handle for output and feature reports
    /// * `numbered_reports` - Whether the descriptor declares report ids
    pub fn new(input: HidDevice, control: HidDevice, numbered_reports: bool) -> Self {
        Self {
            input: Mutex::new(input),
            control: Mutex::new(control),
            numbered_reports,
        }
    }
}

/// Read one input report into `buf` framed as `[id, data...]`
///
/// `read` fills the slice it is given and returns the byte count, 0 on
/// timeout. Unnumbered devices deliver data only, so the read lands after the
/// first byte and report id 0 is put in front.
fn read_framed(
    buf: &mut [u8],
    numbered_reports: bool,
    read: impl FnOnce(&mut [u8]) -> Result<usize, TransportError>,
) -> Result<usize, TransportError> {
    if buf.is_empty() {
        return Ok(0);
    }
    if numbered_reports {
        return read(buf);
    }

    let len = read(&mut buf[1..])?;
    if len == 0 {
        return Ok(0);
    }
    buf[0] = 0;
    Ok(len + 1)
}

impl Transport for HidTransport {
    fn read_input(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        let device = self.input.lock();
        read_framed(buf, self.numbered_reports, |dest| {
            Ok(device.read_timeout(dest, timeout_ms)?)
        })
    }

    fn write_output(&self, data: &[u8]) -> Result<usize, TransportError> {
        let device = self.control.lock();
        let written = device.write(data)?;
        debug!("Wrote {} of {} output bytes", written, data.len());
        Ok(written)
    }

    fn get_feature(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let device = self.control.lock();
        Ok(device.get_feature_report(buf)?)
    }

    fn send_feature(&self, data: &[u8]) -> Result<(), TransportError> {
        let device = self.control.lock();
        device.send_feature_report(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver(data: &'static [u8]) -> impl FnOnce(&mut [u8]) -> Result<usize, TransportError> {
        move |dest: &mut [u8]| {
            dest[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_numbered_report_passes_through() {
        let mut buf = [0xFFu8; 5];
        let len = read_framed(&mut buf, true, deliver(&[0x03, 0xAA, 0xBB])).unwrap();
        assert_eq!(len, 3);
        assert_eq!(&buf[..len], &[0x03, 0xAA, 0xBB]);
    }

    #[test]
    fn test_unnumbered_report_gets_id_zero() {
        let mut buf = [0xFFu8; 5];
        let len = read_framed(&mut buf, false, |dest| {
            // Data must land after the id byte, with room for the full report
            assert_eq!(dest.len(), 4);
            dest[..4].copy_from_slice(&[0x10, 0x20, 0x30, 0x40]);
            Ok(4)
        })
        .unwrap();
        assert_eq!(len, 5);
        assert_eq!(buf, [0x00, 0x10, 0x20, 0x30, 0x40]);
    }

    #[test]
    fn test_timeout_reads_nothing() {
        for numbered in [true, false] {
            let mut buf = [0xFFu8; 4];
            assert_eq!(read_framed(&mut buf, numbered, |_| Ok(0)).unwrap(), 0);
            assert_eq!(buf, [0xFF; 4]);
        }
    }

    #[test]
    fn test_empty_buffer_skips_the_read() {
        let len = read_framed(&mut [], false, |_| panic!("read on an empty buffer")).unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut buf = [0u8; 4];
        let err = read_framed(&mut buf, false, |_| Err(TransportError::Disconnected)).unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }
}
