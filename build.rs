fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Capture build time at compile time
    let build_time = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);
}
