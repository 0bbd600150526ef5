use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use super::error::InfraError;

/// Read a body from `path`, or from stdin when no path is given.
pub fn read_body(path: Option<&Path>) -> Result<String, InfraError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut body = String::new();
            io::stdin().lock().read_to_string(&mut body)?;
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "# Title").expect("write");
        assert_eq!(read_body(Some(file.path())).expect("read"), "# Title");
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = read_body(Some(Path::new("/nonexistent/postrender/body.md")))
            .expect_err("missing file");
        assert!(matches!(err, InfraError::Io(_)));
    }
}
