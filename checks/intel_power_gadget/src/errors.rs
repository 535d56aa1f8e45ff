use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not load the Intel Power Gadget library from '{path}'")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("missing symbol '{symbol}' in the Intel Power Gadget library")]
    Symbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("call to {symbol} failed")]
    Call { symbol: &'static str },
    #[error(
        "no default Intel Power Gadget library location on this platform, \
         set 'library_path' in the instance configuration"
    )]
    NoDefaultLibrary,
    #[error("no CPU packages discovered")]
    NoPackages,
    #[error("sample carries {got} core entries, package has {expected} cores")]
    CoreCountMismatch { got: usize, expected: usize },
    #[error("no open sampling window")]
    MissingWindow,
}

/// A per-package failure inside one collection cycle. The cycle keeps going
/// for the remaining packages.
#[derive(Error, Debug)]
#[error("package {package}: {source}")]
pub struct PackageError {
    pub package: i32,
    #[source]
    pub source: Error,
}
