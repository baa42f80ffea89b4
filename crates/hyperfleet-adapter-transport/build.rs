use std::io::Result;

fn main() -> Result<()> {
    tonic_build::configure().compile_protos(&["proto/cloudevent.proto"], &["proto/"])?;
    println!("cargo:rerun-if-changed=proto/cloudevent.proto");
    Ok(())
}
