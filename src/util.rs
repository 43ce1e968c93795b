
/// Sets up a logger printing to stdout.
///
/// An error from [fern] is ignored because the logger may only be
/// initiated once and every suite hook tries to initiate it.
pub fn init_logging() {
	let _ = fern::Dispatch::new()
		.format(|out, msg, rec| {
			let now = chrono::Local::now();
			let stamp = now.format("%H:%M:%S%.3f");
			out.finish(format_args!("[{} {: >5}] {}", stamp, rec.level(), msg))
		})
		.level(log::LevelFilter::Debug)
		.chain(std::io::stdout())
		.apply();
}
