//! Minimal PCM WAV reader, just enough for inline tone detection (§4.2
//! stage 7) to get at mono sample data without depending on a full audio
//! container crate.

pub struct WavInfo {
	pub sample_rate: u32,
	pub channels: u16,
	pub samples: Vec<i16>,
}

pub fn parse_wav(bytes: &[u8]) -> Option<WavInfo> {
	if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
		return None;
	}

	let mut pos = 12;
	let mut sample_rate = 0u32;
	let mut channels = 1u16;
	let mut bits_per_sample = 16u16;
	let mut data: Option<&[u8]> = None;

	while pos + 8 <= bytes.len() {
		let chunk_id = &bytes[pos..pos + 4];
		let chunk_size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().ok()?) as usize;
		let body_start = pos + 8;
		let body_end = body_start.checked_add(chunk_size)?.min(bytes.len());

		match chunk_id {
			b"fmt " if chunk_size >= 16 => {
				let body = &bytes[body_start..body_end];
				if body.len() >= 16 {
					channels = u16::from_le_bytes(body[2..4].try_into().ok()?);
					sample_rate = u32::from_le_bytes(body[4..8].try_into().ok()?);
					bits_per_sample = u16::from_le_bytes(body[14..16].try_into().ok()?);
				}
			}
			b"data" => {
				data = Some(&bytes[body_start..body_end]);
			}
			_ => {}
		}

		pos = body_end + (chunk_size % 2);
	}

	let data = data?;
	if bits_per_sample != 16 || sample_rate == 0 {
		return None;
	}

	let samples = data
		.chunks_exact(2)
		.map(|c| i16::from_le_bytes([c[0], c[1]]))
		.collect();

	Some(WavInfo {
		sample_rate,
		channels,
		samples,
	})
}
