//! Template Engine (§4.7): expands `{dot.path}` tokens inside a JSON
//! template using a call record as the data source.
//!
//! A small interpreter over a token stream and a dot-path resolver, not a
//! general-purpose string formatter — only `{...}` spans are ever
//! substituted, and missing paths render as the empty string rather than
//! erroring.

use icad_model::CallRecord;
use icad_util::template_timestamp;
use serde_json::{Map, Value};

/// Builds the data mapping a template is rendered against: the call
/// record's own JSON shape, plus the derived/special tokens §4.7 names.
pub fn build_data(call: &CallRecord) -> Value {
	let mut root = serde_json::to_value(call).unwrap_or(Value::Null);

	if let Value::Object(map) = &mut root {
		map.insert(
			"timestamp".to_string(),
			Value::String(template_timestamp(call.start_time)),
		);
		map.insert(
			"timestamp_epoch".to_string(),
			serde_json::json!(call.start_time),
		);

		if let Some(transcript) = &call.transcript {
			let segments_text = transcript
				.segments
				.iter()
				.map(|s| s.text.as_str())
				.collect::<Vec<_>>()
				.join("\n");
			let addresses_text = transcript.addresses.join(", ");
			if let Some(Value::Object(t)) = map.get_mut("transcript") {
				t.insert("segments_text".to_string(), Value::String(segments_text));
				t.insert(
					"addresses_text".to_string(),
					Value::String(addresses_text),
				);
			}
		}

		let report_text = tone_report_text(call);
		let report_html = tone_report_html(call);
		if let Some(Value::Object(t)) = map.get_mut("tones") {
			t.insert("report_text".to_string(), Value::String(report_text));
			t.insert("report_html".to_string(), Value::String(report_html));
		}
	}

	root
}

fn describe_tone(kind: &str, entries: &[Value]) -> Vec<String> {
	entries
		.iter()
		.map(|e| format!("{kind}: {}", compact(e)))
		.collect()
}

fn compact(v: &Value) -> String {
	serde_json::to_string(v).unwrap_or_default()
}

fn tone_report_text(call: &CallRecord) -> String {
	let mut lines = Vec::new();
	lines.extend(describe_tone("hi_low_tone", &call.tones.hi_low_tone));
	lines.extend(describe_tone("two_tone", &call.tones.two_tone));
	lines.extend(describe_tone("long_tone", &call.tones.long_tone));
	lines.join("\n")
}

fn tone_report_html(call: &CallRecord) -> String {
	let mut lines = Vec::new();
	lines.extend(describe_tone("hi_low_tone", &call.tones.hi_low_tone));
	lines.extend(describe_tone("two_tone", &call.tones.two_tone));
	lines.extend(describe_tone("long_tone", &call.tones.long_tone));
	lines
		.iter()
		.map(|l| format!("<p>{l}</p>"))
		.collect::<Vec<_>>()
		.join("")
}

/// Renders `template` against `data`, recursing into objects and arrays
/// and expanding `{path}` tokens inside every string leaf.
pub fn render(template: &Value, data: &Value) -> Value {
	match template {
		Value::String(s) => Value::String(render_string(s, data)),
		Value::Array(items) => Value::Array(items.iter().map(|v| render(v, data)).collect()),
		Value::Object(map) => {
			let mut out = Map::with_capacity(map.len());
			for (k, v) in map {
				out.insert(k.clone(), render(v, data));
			}
			Value::Object(out)
		}
		other => other.clone(),
	}
}

fn render_string(s: &str, data: &Value) -> String {
	let mut out = String::with_capacity(s.len());
	let bytes = s.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'{' {
			if let Some(end) = s[i + 1..].find('}') {
				let path = &s[i + 1..i + 1 + end];
				out.push_str(&resolved_to_string(data, path));
				i = i + 1 + end + 1;
				continue;
			}
		}
		let ch = s[i..].chars().next().unwrap();
		out.push(ch);
		i += ch.len_utf8();
	}
	out
}

fn resolved_to_string(data: &Value, path: &str) -> String {
	match resolve_path(data, path) {
		Some(Value::String(s)) => s,
		Some(other) => compact(&other),
		None => String::new(),
	}
}

/// Dot-path traversal over a JSON object tree. Missing keys (or a
/// non-object encountered mid-path) resolve to `None`.
pub fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
	let mut current = data;
	for segment in path.split('.') {
		current = current.as_object()?.get(segment)?;
	}
	Some(current)
}

/// Renders a template given as raw JSON text, returning the rendered JSON
/// text. Used for webhook bodies stored as a string in config.
pub fn render_json_str(template: &str, call: &CallRecord) -> Result<String, serde_json::Error> {
	let template_value: Value = serde_json::from_str(template)?;
	let data = build_data(call);
	let rendered = render(&template_value, &data);
	serde_json::to_string(&rendered)
}

#[cfg(test)]
mod tests {
	use super::*;
	use icad_model::SmolStr;

	fn sample_call() -> CallRecord {
		serde_json::from_value(serde_json::json!({
			"instance_id": "abc",
			"short_name": "sys1",
			"talkgroup": 100,
			"start_time": 1700000000.0,
			"call_length": 5.0,
			"filename": "1700000000_100.wav",
		}))
		.unwrap()
	}

	#[test]
	fn idempotent_without_tokens() {
		let call = sample_call();
		let data = build_data(&call);
		let template = serde_json::json!({"plain": "no tokens here"});
		let rendered = render(&template, &data);
		assert_eq!(rendered, template);
	}

	#[test]
	fn resolves_dot_path() {
		let call = sample_call();
		let data = build_data(&call);
		assert_eq!(
			resolve_path(&data, "short_name"),
			Some(&Value::String("sys1".to_string()))
		);
		assert_eq!(resolve_path(&data, "nope.nope"), None);
	}

	#[test]
	fn expands_tokens_in_string() {
		let call = sample_call();
		let data = build_data(&call);
		let template = serde_json::json!("system {short_name} tg {talkgroup}");
		let rendered = render(&template, &data);
		assert_eq!(rendered, Value::String("system sys1 tg 100".to_string()));
	}

	#[test]
	fn missing_path_renders_empty() {
		let call = sample_call();
		let data = build_data(&call);
		let template = serde_json::json!("[{nothing.here}]");
		let rendered = render(&template, &data);
		assert_eq!(rendered, Value::String("[]".to_string()));
	}

	#[test]
	fn smol_str_roundtrips() {
		let s: SmolStr = "x".into();
		assert_eq!(s, "x");
	}
}
