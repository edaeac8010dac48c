use std::fs;
use std::path::PathBuf;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

pub fn assert_golden(name: &str, actual: &str) {
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/golden");
    if let Err(err) = fs::create_dir_all(&base_dir) {
        panic!("无法创建黄金数据目录 {}: {err}", base_dir.display());
    }
    let golden_path = base_dir.join(format!("{name}.tex"));

    if !golden_path.exists() {
        fs::write(&golden_path, actual)
            .unwrap_or_else(|err| panic!("写入黄金文件 {} 失败: {err}", golden_path.display()));
        panic!(
            "黄金文件 {} 不存在，已自动生成。请确认内容后重新运行测试。",
            golden_path.display()
        );
    }

    let expected = fs::read_to_string(&golden_path)
        .unwrap_or_else(|err| panic!("读取黄金文件 {} 失败: {err}", golden_path.display()));

    if expected != actual {
        let diff_path = base_dir.join(format!("{name}.actual.tex"));
        fs::write(&diff_path, actual).expect("写入差异文件失败");
        panic!(
            "黄金文件 {} 与当前输出不一致。已生成对照输出 {}。",
            golden_path.display(),
            diff_path.display()
        );
    }
}
