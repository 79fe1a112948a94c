// GDAL is linked through vcpkg on Windows; elsewhere the system library is used.
fn main() {
    let target = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target == "windows" {
        vcpkg::Config::new()
            .find_package("gdal")
            .expect("gdal not found in vcpkg");
    }
}
