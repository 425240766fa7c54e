use std::ffi::OsStr;
use std::path::Path;

pub trait PathExt {
    fn is_xml_file(&self) -> bool;
}

impl PathExt for Path {
    fn is_xml_file(&self) -> bool {
        self.extension() == Some(OsStr::new("xml"))
    }
}
