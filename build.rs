fn main() {
    println!("cargo:rerun-if-env-changed=BUILD_TAG");
    shadow_rs::ShadowBuilder::builder()
        .build()
        .expect("failed to generate build information");
}
