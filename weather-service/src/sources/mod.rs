pub mod wx_file;

pub use wx_file::WxFileSource;
