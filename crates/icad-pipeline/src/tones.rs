//! Inline tone detection (§4.2 stage 7). Not classified as an external
//! collaborator by §1's Non-goals (only the *services* wrapping tone
//! detection are out of scope), so the detection algorithm itself is
//! implemented here — a zero-crossing-rate dominant-frequency estimate
//! per fixed window, which is the standard cheap approximation for
//! narrow-band paging tones (two-tone sequential, long tone, hi-low
//! siren) and avoids pulling in an FFT crate for a single-purpose
//! estimate.

use icad_model::Tones;

use crate::wav::WavInfo;

const WINDOW_SECONDS: f64 = 0.2;
const MIN_LONG_TONE_SECONDS: f64 = 0.8;
const HI_LOW_MIN_CYCLES: usize = 3;
const FREQ_MATCH_HZ: f64 = 60.0;

struct Window {
	start: f64,
	freq: f64,
}

fn windows(wav: &WavInfo) -> Vec<Window> {
	let channel_count = wav.channels.max(1) as usize;
	let window_len = (WINDOW_SECONDS * wav.sample_rate as f64) as usize * channel_count;
	if window_len == 0 {
		return Vec::new();
	}

	wav.samples
		.chunks(window_len)
		.enumerate()
		.filter_map(|(i, chunk)| {
			if chunk.len() < 4 {
				return None;
			}
			let freq = dominant_frequency(chunk, wav.sample_rate, channel_count);
			(freq > 0.0).then_some(Window {
				start: i as f64 * WINDOW_SECONDS,
				freq,
			})
		})
		.collect()
}

/// Dominant frequency via zero-crossing rate: cycles-per-second scaled
/// from crossings-per-window. Approximate, but adequate to distinguish
/// narrow-band paging tones in the few-hundred-Hz range.
fn dominant_frequency(chunk: &[i16], sample_rate: u32, channel_count: usize) -> f64 {
	let mono: Vec<i16> = chunk
		.chunks(channel_count)
		.map(|frame| frame[0])
		.collect();
	if mono.len() < 2 {
		return 0.0;
	}

	let mut crossings = 0usize;
	for pair in mono.windows(2) {
		if (pair[0] >= 0) != (pair[1] >= 0) {
			crossings += 1;
		}
	}

	let duration = mono.len() as f64 / sample_rate as f64;
	if duration <= 0.0 {
		return 0.0;
	}
	(crossings as f64 / 2.0) / duration
}

fn group_runs(windows: &[Window]) -> Vec<(f64, f64, f64)> {
	let mut runs = Vec::new();
	let mut iter = windows.iter().peekable();

	while let Some(first) = iter.next() {
		let mut end = first.start + WINDOW_SECONDS;
		let mut freq_sum = first.freq;
		let mut count = 1.0;

		while let Some(next) = iter.peek() {
			if (next.freq - first.freq).abs() <= FREQ_MATCH_HZ {
				end = next.start + WINDOW_SECONDS;
				freq_sum += next.freq;
				count += 1.0;
				iter.next();
			} else {
				break;
			}
		}

		runs.push((first.start, end, freq_sum / count));
	}

	runs
}

pub fn detect(wav: &WavInfo) -> Tones {
	let win = windows(wav);
	let runs = group_runs(&win);

	let mut long_tone = Vec::new();
	for (start, end, freq) in &runs {
		if end - start >= MIN_LONG_TONE_SECONDS {
			long_tone.push(serde_json::json!({
				"freq": freq.round(),
				"start": start,
				"length": end - start,
			}));
		}
	}

	let mut two_tone = Vec::new();
	for pair in runs.windows(2) {
		let (a_start, a_end, a_freq) = pair[0];
		let (_, b_end, b_freq) = pair[1];
		if (a_end - a_start) >= 0.6 && (a_freq - b_freq).abs() > FREQ_MATCH_HZ {
			two_tone.push(serde_json::json!({
				"tone_a": a_freq.round(),
				"tone_b": b_freq.round(),
				"start": a_start,
				"length": b_end - a_start,
			}));
		}
	}

	let mut hi_low_tone = Vec::new();
	if runs.len() >= HI_LOW_MIN_CYCLES {
		for triple in runs.windows(3) {
			let freqs: Vec<f64> = triple.iter().map(|r| r.2).collect();
			let alternating = (freqs[0] - freqs[2]).abs() <= FREQ_MATCH_HZ
				&& (freqs[0] - freqs[1]).abs() > FREQ_MATCH_HZ;
			if alternating {
				hi_low_tone.push(serde_json::json!({
					"tone_hi": freqs[0].max(freqs[1]).round(),
					"tone_low": freqs[0].min(freqs[1]).round(),
					"start": triple[0].0,
				}));
			}
		}
	}

	Tones {
		hi_low_tone,
		two_tone,
		long_tone,
	}
}
