use std::fmt::{Display, Formatter, Result};

use pairdeploy_deployments::types::DeploymentPlan;

pub struct DeploymentSynthesis {
    pub steps_count: usize,
    pub transactions_count: usize,
    pub content: String,
}

impl DeploymentSynthesis {
    pub fn from_plan(plan: &DeploymentPlan) -> std::result::Result<DeploymentSynthesis, String> {
        let content = plan.to_file_content()?;
        let content = String::from_utf8(content)
            .map_err(|e| format!("unable to render deployment plan\n{}", e))?;
        Ok(DeploymentSynthesis {
            steps_count: plan.batches.len(),
            transactions_count: plan.transactions_count(),
            content,
        })
    }
}

impl Display for DeploymentSynthesis {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(
            f,
            "{}\n\n{}\n{}",
            green!("{}", self.content),
            blue!("Steps:\t\t{}", self.steps_count),
            blue!("Transactions:\t{}", self.transactions_count)
        )
    }
}
