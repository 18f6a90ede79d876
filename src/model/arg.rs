use clap::Parser;

/// 视频质量预测服务
#[derive(Parser, Debug)]
#[command(name = "vq-rs", version, about = "视频质量预测服务")]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// 覆盖配置中的监听地址
    #[arg(long)]
    pub host: Option<String>,

    /// 覆盖配置中的监听端口
    #[arg(short, long)]
    pub port: Option<u16>,
}
