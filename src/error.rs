use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a readable docx archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive has no {0} part")]
    MissingPart(&'static str),

    #[error("malformed document xml: {0}")]
    Xml(#[from] roxmltree::Error),
}
