//! ICMP Echo Request construction.
//!
//! Only the request side is encoded. Replies are timed on arrival and never
//! parsed.

use std::time::{SystemTime, UNIX_EPOCH};

/// ICMP type of an echo request.
pub const ICMP_ECHO_REQUEST: u8 = 8;

/// Identifier stamped on every probe of a session, shared by all workers.
pub const ECHO_IDENTIFIER: u16 = 1;

/// Type, code, checksum, identifier and sequence.
pub const ICMP_HEADER_LEN: usize = 8;

/// The payload is a single f64 timestamp.
pub const ECHO_PAYLOAD_LEN: usize = 8;

pub const ECHO_REQUEST_LEN: usize = ICMP_HEADER_LEN + ECHO_PAYLOAD_LEN;

/// Internet checksum (RFC 1071) of `data`.
///
/// Words are summed little-endian into a 32-bit accumulator, a trailing odd
/// byte is added on its own, the carry is folded twice and the complement is
/// byte-swapped. The result's big-endian bytes go straight into the checksum
/// field.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(word[1]) * 256 + u32::from(word[0]));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last));
    }

    sum = (sum >> 16) + (sum & 0xFFFF);
    sum += sum >> 16;
    let answer = (!sum & 0xFFFF) as u16;
    answer.swap_bytes()
}

/// Check the one field a finished datagram must get right: summing it with
/// its checksum in place has to come out as zero.
pub fn verify(packet: &[u8]) -> bool {
    packet.len() >= ICMP_HEADER_LEN && checksum(packet) == 0
}

/// Seconds since the Unix epoch, as carried in the probe payload.
pub fn wall_clock_secs() -> f64 {
    // A clock set before 1970 just yields a zero timestamp
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Build an echo request stamped with the current wall-clock time.
pub fn build_echo_request(sequence: u16, identifier: u16) -> Vec<u8> {
    build_echo_request_at(sequence, identifier, wall_clock_secs())
}

/// Build an echo request carrying `timestamp` as its payload.
///
/// Identifier, sequence and timestamp are written little-endian; the checksum
/// is computed with its own field zeroed and then filled in.
pub fn build_echo_request_at(
    sequence: u16,
    identifier: u16,
    timestamp: f64,
) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ECHO_REQUEST_LEN);
    packet.push(ICMP_ECHO_REQUEST);
    packet.push(0);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&identifier.to_le_bytes());
    packet.extend_from_slice(&sequence.to_le_bytes());
    packet.extend_from_slice(&timestamp.to_le_bytes());

    let sum = checksum(&packet);
    packet[2..4].copy_from_slice(&sum.to_be_bytes());
    packet
}
