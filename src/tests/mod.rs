mod mock;
mod mqtt;
mod wifi;
