//! Company metadata lookup port trait.

use crate::domain::company::CompanyInfo;
use crate::domain::error::AnalyzerError;

pub trait MetadataPort {
    fn lookup(&self, instrument: &str) -> Result<CompanyInfo, AnalyzerError>;
}
