fn main() {
    println!("cargo:rerun-if-changed=linker.ld");
    println!("cargo:rerun-if-changed=i686-trios.json");

    // Only the freestanding binary is linked with the kernel layout.
    if std::env::var_os("CARGO_FEATURE_BARE_METAL").is_some() {
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
        println!("cargo:rustc-link-arg-bin=kernel=-T{}/linker.ld", manifest_dir);
    }
}
