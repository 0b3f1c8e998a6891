use instanced_crates::InstancedCrates;

fn main() -> anyhow::Result<()> {
    pollster::block_on(framework::run::<InstancedCrates>())
}
