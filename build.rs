use vergen::EmitBuilder;

fn main() {
    // 版本信息里带上构建时间和提交号
    EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()
        .expect("Failed to generate build information");
}
