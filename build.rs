use uniffi_bindgen::bindings::TargetLanguage::Python;
use uniffi_bindgen::generate_bindings;

fn main() {
    let udl_file = "./src/ecgcore.udl";
    let out_dir = "./bindings/";
    println!("cargo:rerun-if-changed={}", udl_file);
    uniffi_build::generate_scaffolding(udl_file).unwrap();
    generate_bindings(
        udl_file.into(),
        None,
        vec![Python],
        Some(out_dir.into()),
        None,
        None,
        true,
    )
    .unwrap();
}
