use std::io;

/// Loads variables from a `.env` file in the current directory or any of its
/// parents. A missing file is not an error, a malformed one is reported on
/// stderr since logging is usually not set up yet.
pub fn load_dotenvy_vars_if_present() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Ignoring .env file: {e}"),
    }
}
