pub mod deploy_routine;
