//! Epoch/partition-path helpers shared by the transcoder, archive, and
//! template engine.

use time::format_description::well_known::Iso8601;
use time::OffsetDateTime;

/// `<YYYY>/<M>/<D>` with non-zero-padded month/day, per §6's archive layout.
pub fn partition_path(epoch_seconds: f64) -> String {
	let dt = to_utc(epoch_seconds);
	format!("{}/{}/{}", dt.year(), u8::from(dt.month()), dt.day())
}

pub fn to_utc(epoch_seconds: f64) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp(epoch_seconds.floor() as i64)
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// `YYYY-MM-DDTHH:MM:SS.ffffffZ`, the RDIO `dateTime` format (§4.6).
pub fn rdio_datetime(epoch_seconds: f64) -> String {
	let dt = to_utc(epoch_seconds);
	let micros = ((epoch_seconds.fract()) * 1_000_000.0).round() as u32;
	format!(
		"{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
		dt.year(),
		u8::from(dt.month()),
		dt.day(),
		dt.hour(),
		dt.minute(),
		dt.second(),
		micros
	)
}

/// ISO-8601 UTC date, used for the transcoder's `date` metadata tag.
pub fn iso8601_date(epoch_seconds: f64) -> String {
	let dt = to_utc(epoch_seconds);
	dt.format(&Iso8601::DATE)
		.unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", dt.year(), u8::from(dt.month()), dt.day()))
}

/// `timestamp` derived token for the template engine (§4.7).
pub fn template_timestamp(epoch_seconds: f64) -> String {
	let dt = to_utc(epoch_seconds);
	format!(
		"{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
		dt.year(),
		u8::from(dt.month()),
		dt.day(),
		dt.hour(),
		dt.minute(),
		dt.second()
	)
}
