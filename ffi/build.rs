use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let header = PathBuf::from(&crate_dir).join("include").join("exchange.h");

    println!("cargo:rerun-if-changed=src");

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("EXCHANGE_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(header);
        }
        Err(e) => println!("cargo:warning=skipping C header generation: {e}"),
    }
}
