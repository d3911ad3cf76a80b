//! Duplicate Detector (§4.3): a per-`(short_name, talkgroup)` sliding
//! window of recently accepted calls, bounded to 15 entries.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use icad_model::{CallRecord, DuplicateConfig, SmolStr};

const WINDOW_SIZE: usize = 15;

#[derive(Debug, Clone)]
struct WindowEntry {
	start_time: f64,
	call_length: f64,
	instance_id: SmolStr,
}

impl From<&CallRecord> for WindowEntry {
	fn from(call: &CallRecord) -> Self {
		Self {
			start_time: call.start_time,
			call_length: call.call_length,
			instance_id: call.instance_id.clone(),
		}
	}
}

/// Shared across workers; the whole structure sits behind one mutex, and
/// check-and-insert is one critical section (§5).
#[derive(Default)]
pub struct MessageHistory {
	windows: Mutex<HashMap<(SmolStr, i64), VecDeque<WindowEntry>>>,
}

impl MessageHistory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` if `call` is a duplicate of something already in the
	/// window for its `(short_name, talkgroup)` (or its simulcast group).
	/// If not a duplicate, inserts `call` into every checked window.
	pub fn check_and_insert(&self, call: &CallRecord, config: &DuplicateConfig) -> bool {
		if !config.is_active() {
			return false;
		}

		let talkgroups = simulcast_group(config, call.talkgroup);
		let entry = WindowEntry::from(call);

		let mut windows = self.windows.lock().unwrap();

		for tg in &talkgroups {
			let key = (call.short_name.clone(), *tg);
			if let Some(window) = windows.get(&key) {
				if window
					.iter()
					.any(|existing| is_duplicate(config, &entry, existing))
				{
					return true;
				}
			}
		}

		for tg in talkgroups {
			let key = (call.short_name.clone(), tg);
			let window = windows.entry(key).or_default();
			window.push_back(entry.clone());
			while window.len() > WINDOW_SIZE {
				window.pop_front();
			}
		}

		false
	}
}

fn simulcast_group(config: &DuplicateConfig, talkgroup: i64) -> Vec<i64> {
	for group in &config.simulcast_talkgroups {
		if group.contains(&talkgroup) {
			return group.clone();
		}
	}
	vec![talkgroup]
}

fn is_duplicate(config: &DuplicateConfig, new: &WindowEntry, existing: &WindowEntry) -> bool {
	let start_threshold = config.start_difference_threshold.unwrap_or(0.0);
	let length_threshold = config.length_threshold.unwrap_or(0.0);

	let within_start = (new.start_time - existing.start_time).abs() <= start_threshold;
	let within_length = (new.call_length - existing.call_length).abs() <= length_threshold;
	let instance_ok = config.check_same_instance || new.instance_id != existing.instance_id;

	within_start && within_length && instance_ok
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> DuplicateConfig {
		DuplicateConfig {
			enabled: true,
			start_difference_threshold: Some(1.0),
			length_threshold: Some(0.5),
			check_same_instance: false,
			simulcast_talkgroups: vec![],
		}
	}

	fn call(instance_id: &str, start_time: f64, call_length: f64) -> CallRecord {
		serde_json::from_value(serde_json::json!({
			"instance_id": instance_id,
			"short_name": "sys1",
			"talkgroup": 100,
			"start_time": start_time,
			"call_length": call_length,
			"filename": "x.wav",
		}))
		.unwrap()
	}

	#[test]
	fn first_call_never_duplicate() {
		let history = MessageHistory::new();
		assert!(!history.check_and_insert(&call("a", 1700000000.0, 5.0), &config()));
	}

	#[test]
	fn close_call_different_instance_is_duplicate() {
		let history = MessageHistory::new();
		history.check_and_insert(&call("a", 1700000000.0, 5.0), &config());
		assert!(history.check_and_insert(&call("b", 1700000000.5, 5.1), &config()));
	}

	#[test]
	fn same_instance_not_duplicate_by_default() {
		let history = MessageHistory::new();
		history.check_and_insert(&call("a", 1700000000.0, 5.0), &config());
		assert!(!history.check_and_insert(&call("a", 1700000000.5, 5.1), &config()));
	}

	#[test]
	fn disabled_feature_never_flags() {
		let history = MessageHistory::new();
		let mut cfg = config();
		cfg.start_difference_threshold = None;
		history.check_and_insert(&call("a", 1700000000.0, 5.0), &cfg);
		assert!(!history.check_and_insert(&call("b", 1700000000.0, 5.0), &cfg));
	}

	#[test]
	fn window_bounded_to_fifteen() {
		let history = MessageHistory::new();
		let cfg = config();
		for i in 0..20 {
			history.check_and_insert(&call("a", 1700000000.0 + i as f64 * 100.0, 5.0), &cfg);
		}
		let windows = history.windows.lock().unwrap();
		let window = windows.get(&("sys1".into(), 100)).unwrap();
		assert_eq!(window.len(), WINDOW_SIZE);
	}
}
